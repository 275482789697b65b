//! Catalog layout: normalised rows + resolved images → abstract [`Block`]s.
//!
//! This stage is pure. It never fetches, never measures text, never knows
//! about PDF; it decides *what* goes on which page and in which order, and
//! the renderer decides *where*.
//!
//! ```text
//! cover:     Spacer · Title · Date · [Logo] · PageBreak
//! per group: [Banner] · Grid · Spacer · (PageBreak · Grid · Spacer)* · PageBreak
//! ```
//!
//! Groups follow the first-seen order of their category in the input.
//! Each group is chunked independently into grids of
//! `cards_per_row × rows_per_page` cards, one chunk per page, so a
//! category's last grid may be partially filled. A short trailing row holds only the cards that exist.

use crate::config::LayoutOptions;
use crate::pipeline::image::ResolvedImage;
use crate::record::{ProductRecord, NOT_AVAILABLE};
use chrono::NaiveDate;

/// Space above the cover title.
const COVER_TOP_SPACE_CM: f32 = 5.0;
/// Gap after each grid.
const GRID_GAP_CM: f32 = 1.0;
/// Edge of the cover logo box.
const LOGO_SIZE_CM: f32 = 4.0;

/// Typographic role of a paragraph; the renderer maps it to font and size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextStyle {
    /// Cover title.
    Title,
    /// Cover sub-line (date).
    Subtitle,
    /// Product name on a card.
    CardTitle,
    /// Category, price and stock lines on a card.
    CardText,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    pub text: String,
    pub style: TextStyle,
}

impl Paragraph {
    pub fn new(text: impl Into<String>, style: TextStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

/// One product card: image box stacked above four text lines.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub image: ResolvedImage,
    /// Edge of the square image box, in cm.
    pub image_size_cm: f32,
    /// Name, category, price and stock, in that order.
    pub lines: Vec<Paragraph>,
}

/// One page worth of cards.
///
/// Every row has between 1 and `columns` cards; only the last row may be
/// short. Cells are plain [`Card`]s, there is no empty cell to fill.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub columns: usize,
    pub rows: Vec<Vec<Card>>,
}

impl Grid {
    pub fn card_count(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }
}

/// Abstract renderable unit handed to a [`crate::render::DocumentRenderer`].
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Paragraph(Paragraph),
    /// Full-width coloured category header.
    Banner(String),
    /// Stand-alone image box (cover logo). Placeholders render as grey boxes.
    Image { image: ResolvedImage, size_cm: f32 },
    Grid(Grid),
    Spacer { height_cm: f32 },
    PageBreak,
}

/// Category name plus the input indices of its rows, in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryGroup {
    pub name: String,
    pub rows: Vec<usize>,
}

/// Partition rows by category, keeping first-seen category order.
pub fn group_by_category(records: &[ProductRecord]) -> Vec<CategoryGroup> {
    let mut groups: Vec<CategoryGroup> = Vec::new();
    for (idx, record) in records.iter().enumerate() {
        match groups.iter_mut().find(|g| g.name == record.category) {
            Some(group) => group.rows.push(idx),
            None => groups.push(CategoryGroup {
                name: record.category.clone(),
                rows: vec![idx],
            }),
        }
    }
    groups
}

/// Cover page content.
#[derive(Debug, Clone)]
pub struct Cover {
    pub title: String,
    pub date: NaiveDate,
    pub logo: Option<ResolvedImage>,
}

/// Builds the block sequence for one catalog.
#[derive(Debug, Clone)]
pub struct LayoutBuilder<'a> {
    options: &'a LayoutOptions,
    currency_symbol: &'a str,
}

impl<'a> LayoutBuilder<'a> {
    pub fn new(options: &'a LayoutOptions) -> Self {
        Self {
            options,
            currency_symbol: "$",
        }
    }

    pub fn currency_symbol(mut self, symbol: &'a str) -> Self {
        self.currency_symbol = symbol;
        self
    }

    /// Build the full block sequence.
    ///
    /// `images[i]` belongs to `records[i]`; a missing entry renders as the
    /// placeholder.
    pub fn build(
        &self,
        records: &[ProductRecord],
        images: &[ResolvedImage],
        cover: &Cover,
    ) -> Vec<Block> {
        let mut blocks = self.cover_blocks(cover);

        for group in group_by_category(records) {
            if self.options.include_category_banner {
                blocks.push(Block::Banner(format!("Category: {}", group.name)));
            }
            let chunks = group.rows.chunks(self.options.cards_per_page().max(1));
            for (n, chunk) in chunks.enumerate() {
                if n > 0 {
                    blocks.push(Block::PageBreak);
                }
                let cards: Vec<Card> = chunk
                    .iter()
                    .map(|&idx| {
                        let image = images
                            .get(idx)
                            .cloned()
                            .unwrap_or(ResolvedImage::Placeholder);
                        self.card(&records[idx], image)
                    })
                    .collect();
                blocks.push(Block::Grid(self.grid(cards)));
                blocks.push(Block::Spacer {
                    height_cm: GRID_GAP_CM,
                });
            }
            blocks.push(Block::PageBreak);
        }

        blocks
    }

    fn cover_blocks(&self, cover: &Cover) -> Vec<Block> {
        let mut blocks = vec![
            Block::Spacer {
                height_cm: COVER_TOP_SPACE_CM,
            },
            Block::Paragraph(Paragraph::new(cover.title.clone(), TextStyle::Title)),
            Block::Paragraph(Paragraph::new(
                format!("Date: {}", cover.date.format("%d/%m/%Y")),
                TextStyle::Subtitle,
            )),
        ];
        if self.options.include_logo {
            if let Some(logo @ ResolvedImage::Image(_)) = &cover.logo {
                blocks.push(Block::Spacer { height_cm: 1.0 });
                blocks.push(Block::Image {
                    image: logo.clone(),
                    size_cm: LOGO_SIZE_CM,
                });
            }
        }
        blocks.push(Block::PageBreak);
        blocks
    }

    fn card(&self, record: &ProductRecord, image: ResolvedImage) -> Card {
        let price = if record.price == NOT_AVAILABLE {
            format!("Price: {NOT_AVAILABLE}")
        } else {
            format!("Price: {}{}", self.currency_symbol, record.price)
        };
        Card {
            image,
            image_size_cm: self.options.card_size_cm,
            lines: vec![
                Paragraph::new(record.name.clone(), TextStyle::CardTitle),
                Paragraph::new(format!("Category: {}", record.category), TextStyle::CardText),
                Paragraph::new(price, TextStyle::CardText),
                Paragraph::new(format!("Stock: {}", record.stock), TextStyle::CardText),
            ],
        }
    }

    fn grid(&self, cards: Vec<Card>) -> Grid {
        let columns = self.options.cards_per_row.max(1);
        let mut rows: Vec<Vec<Card>> = Vec::with_capacity(self.options.rows_per_page);
        let mut row: Vec<Card> = Vec::with_capacity(columns);
        for card in cards {
            row.push(card);
            if row.len() == columns {
                rows.push(std::mem::take(&mut row));
            }
        }
        if !row.is_empty() {
            rows.push(row);
        }
        Grid { columns, rows }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str, category: &str) -> ProductRecord {
        ProductRecord {
            name: name.into(),
            category: category.into(),
            price: "9.99".into(),
            stock: "4".into(),
            image_ref: String::new(),
        }
    }

    fn cover() -> Cover {
        Cover {
            title: "Catalog".into(),
            date: NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(),
            logo: None,
        }
    }

    fn grids(blocks: &[Block]) -> Vec<&Grid> {
        blocks
            .iter()
            .filter_map(|b| match b {
                Block::Grid(g) => Some(g),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn groups_keep_first_seen_order() {
        let records = vec![
            product("1", "B"),
            product("2", "A"),
            product("3", "B"),
            product("4", "C"),
        ];
        let groups = group_by_category(&records);
        let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A", "C"]);
        assert_eq!(groups[0].rows, vec![0, 2]);
    }

    #[test]
    fn thirteen_rows_paginate_as_6_6_1() {
        let records: Vec<_> = (0..13).map(|i| product(&i.to_string(), "Tools")).collect();
        let options = LayoutOptions::default();
        let blocks = LayoutBuilder::new(&options).build(&records, &[], &cover());

        let grids = grids(&blocks);
        let sizes: Vec<usize> = grids.iter().map(|g| g.card_count()).collect();
        assert_eq!(sizes, vec![6, 6, 1]);
        assert_eq!(sizes.iter().sum::<usize>(), 13);

        for full in &grids[..2] {
            assert_eq!(full.rows.len(), 3);
            assert!(full.rows.iter().all(|r| r.len() == 2));
        }
        assert_eq!(grids[2].rows.len(), 1);
        assert_eq!(grids[2].rows[0].len(), 1);
    }

    #[test]
    fn cards_keep_row_order_inside_group() {
        let records = vec![product("x", "A"), product("y", "B"), product("z", "A")];
        let options = LayoutOptions::default();
        let blocks = LayoutBuilder::new(&options).build(&records, &[], &cover());
        let names: Vec<&str> = grids(&blocks)
            .iter()
            .flat_map(|g| g.rows.iter().flatten())
            .map(|c| c.lines[0].text.as_str())
            .collect();
        assert_eq!(names, vec!["x", "z", "y"]);
    }

    #[test]
    fn block_sequence_shape() {
        let records = vec![product("Mug", "Kitchen")];
        let options = LayoutOptions::default();
        let blocks = LayoutBuilder::new(&options).build(&records, &[], &cover());

        assert!(matches!(blocks[0], Block::Spacer { .. }));
        assert_eq!(
            blocks[2],
            Block::Paragraph(Paragraph::new("Date: 09/03/2024", TextStyle::Subtitle))
        );
        assert_eq!(blocks[3], Block::PageBreak);
        assert_eq!(blocks[4], Block::Banner("Category: Kitchen".into()));
        assert!(matches!(blocks[5], Block::Grid(_)));
        assert!(matches!(blocks[6], Block::Spacer { .. }));
        assert_eq!(blocks.last(), Some(&Block::PageBreak));
    }

    #[test]
    fn chunks_of_one_group_are_separated_by_page_breaks() {
        let records: Vec<_> = (0..13).map(|i| product(&format!("P{i}"), "Tools")).collect();
        let options = LayoutOptions::default();
        let blocks = LayoutBuilder::new(&options).build(&records, &[], &cover());

        // Skip the cover: everything up to and including its break.
        let body = &blocks[4..];
        let shape: Vec<&str> = body
            .iter()
            .map(|b| match b {
                Block::Banner(_) => "banner",
                Block::Grid(_) => "grid",
                Block::Spacer { .. } => "spacer",
                Block::PageBreak => "break",
                _ => "other",
            })
            .collect();
        assert_eq!(
            shape,
            vec![
                "banner", "grid", "spacer", "break", "grid", "spacer", "break", "grid", "spacer",
                "break"
            ]
        );
    }

    #[test]
    fn banner_can_be_disabled() {
        let records = vec![product("Mug", "Kitchen")];
        let options = LayoutOptions {
            include_category_banner: false,
            ..LayoutOptions::default()
        };
        let blocks = LayoutBuilder::new(&options).build(&records, &[], &cover());
        assert!(!blocks.iter().any(|b| matches!(b, Block::Banner(_))));
    }

    #[test]
    fn missing_image_entry_is_placeholder() {
        let records = vec![product("Mug", "Kitchen")];
        let options = LayoutOptions::default();
        let blocks = LayoutBuilder::new(&options).build(&records, &[], &cover());
        let card = &grids(&blocks)[0].rows[0][0];
        assert!(card.image.is_placeholder());
        assert_eq!(card.image_size_cm, 5.0);
    }

    #[test]
    fn card_lines_and_currency() {
        let mut p = product("Mug", "Kitchen");
        p.price = "12".into();
        let options = LayoutOptions::default();
        let blocks = LayoutBuilder::new(&options)
            .currency_symbol("€")
            .build(&[p], &[], &cover());
        let texts: Vec<&str> = grids(&blocks)[0].rows[0][0]
            .lines
            .iter()
            .map(|l| l.text.as_str())
            .collect();
        assert_eq!(texts, vec!["Mug", "Category: Kitchen", "Price: €12", "Stock: 4"]);
    }

    #[test]
    fn unknown_price_has_no_currency() {
        let mut p = product("Mug", "Kitchen");
        p.price = NOT_AVAILABLE.into();
        let options = LayoutOptions::default();
        let blocks = LayoutBuilder::new(&options).build(&[p], &[], &cover());
        assert_eq!(grids(&blocks)[0].rows[0][0].lines[2].text, "Price: N/A");
    }

    #[test]
    fn placeholder_logo_is_skipped() {
        let options = LayoutOptions::default();
        let mut c = cover();
        c.logo = Some(ResolvedImage::Placeholder);
        let blocks = LayoutBuilder::new(&options).build(&[], &[], &c);
        assert!(!blocks.iter().any(|b| matches!(b, Block::Image { .. })));
    }

    #[test]
    fn three_per_row_layout() {
        let records: Vec<_> = (0..7).map(|i| product(&i.to_string(), "A")).collect();
        let options = LayoutOptions {
            cards_per_row: 3,
            rows_per_page: 2,
            ..LayoutOptions::default()
        };
        let blocks = LayoutBuilder::new(&options).build(&records, &[], &cover());
        let g = grids(&blocks);
        assert_eq!(g.len(), 2);
        let shape: Vec<usize> = g[0].rows.iter().map(Vec::len).collect();
        assert_eq!(shape, vec![3, 3]);
        assert_eq!(g[1].card_count(), 1);
    }
}
