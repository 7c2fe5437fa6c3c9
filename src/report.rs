//! HTML rendering of the tag report.
//!
//! The document is assembled from small pieces: a [`Table`] of rows and
//! cells rendered through [`fmt::Display`], with user text passed through
//! auto-escaping `askama` fragments. Rendering is pure: the same inputs
//! always produce byte-identical output.

use core::fmt;

use askama::Template;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::aggregate::{SummaryTotals, TagTotals};
use crate::config::{ReportWindow, TagGroup};

/// Message shown instead of the summary when there is nothing to report.
pub const NO_DATA_MESSAGE: &str =
    "No data available. Please check the HEADERS_AND_TAGS configuration.";

/// Message shown when tag data exists but the summary could not be read.
pub const SUMMARY_UNAVAILABLE_MESSAGE: &str =
    "Summary figures are unavailable for this period.";

/// Embedded stylesheet. Mail clients do not load external CSS.
const STYLE: &str = "
body { font-family: Arial, sans-serif; background-color: #1e1e1e; color: #e0e0e0; margin: 0; padding: 0; }
.container { max-width: 800px; margin: 20px auto; background-color: #2e2e2e; border-radius: 8px; padding: 20px; box-shadow: 0 4px 8px rgba(0, 0, 0, 0.3); color: #e0e0e0; }
h1, h2 { color: #f5f5f5; }
table { width: 100%; border-collapse: collapse; margin: 20px 0; color: #e0e0e0; }
th, td { border: 1px solid #444; padding: 8px; text-align: left; vertical-align: top; }
th { background-color: #3c3c3c; color: #ffffff; }
tr:nth-child(even) { background-color: #333; }
tr:nth-child(odd) { background-color: #2e2e2e; }
.subtotal { font-weight: bold; }
";

/// Formats an amount with exactly two decimals, rounding half away from
/// zero. Zero is never printed with a minus sign.
#[inline]
#[must_use]
pub fn format_amount(value: Decimal) -> String {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    if rounded.is_zero() {
        rounded.set_sign_positive(true);
    }
    rounded.to_string()
}

/// Renders an escaped fragment to a string.
fn render_fragment<T: Template>(fragment: &T) -> String {
    let mut out = String::new();
    if let Err(err) = fragment.render_into(&mut out) {
        tracing::error!(error = %err, "HTML fragment failed to render");
    }
    out
}

/// A table cell.
#[derive(Debug, Clone, PartialEq, Eq, Template)]
#[template(
    source = r#"{% if subtotal %}<td class="subtotal"><b>{{ text }}</b></td>{% else %}<td>{{ text }}</td>{% endif %}"#,
    ext = "html"
)]
struct Cell {
    /// Cell text.
    text: String,
    /// Whether the cell belongs to a subtotal row.
    subtotal: bool,
}

/// A section heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Template)]
#[template(source = "<h2>{{ title }}</h2>", ext = "html")]
struct Heading<'title> {
    /// Heading text.
    title: &'title str,
}

/// A table holding a single message cell, used where a data table
/// cannot be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Template)]
#[template(
    source = "<table><tbody><tr><td>{{ message }}</td></tr></tbody></table>",
    ext = "html"
)]
struct Notice<'msg> {
    /// Message text.
    message: &'msg str,
}

/// A `<table>` with a fixed header and any number of rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    /// Column headings with their width in percent.
    columns: Vec<(&'static str, u8)>,
    /// Body rows.
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Creates a table with the given `(heading, width %)` columns.
    #[inline]
    #[must_use]
    pub fn new(columns: Vec<(&'static str, u8)>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Standard three-column amount table.
    fn amounts(first_heading: &'static str) -> Self {
        Self::new(vec![(first_heading, 60), ("Currency", 20), ("Amount", 20)])
    }

    /// Appends a regular row.
    #[inline]
    pub fn push_row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(cells, false);
    }

    /// Appends a bold subtotal row.
    #[inline]
    pub fn push_subtotal_row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(cells, true);
    }

    /// Appends a row with the given emphasis.
    fn push<I, S>(&mut self, cells: I, subtotal: bool)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(
            cells
                .into_iter()
                .map(|text| Cell {
                    text: text.into(),
                    subtotal,
                })
                .collect(),
        );
    }
}

impl fmt::Display for Table {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<table><thead><tr>")?;
        for &(heading, width) in &self.columns {
            write!(f, r#"<th style="width: {width}%;">{heading}</th>"#)?;
        }
        f.write_str("</tr></thead><tbody>")?;
        for row in &self.rows {
            f.write_str("<tr>")?;
            for cell in row {
                f.write_str(&render_fragment(cell))?;
            }
            f.write_str("</tr>")?;
        }
        f.write_str("</tbody></table>")
    }
}

/// Renders report fragments and the full document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportBuilder {
    /// Text for the Currency column.
    currency_label: String,
}

impl ReportBuilder {
    /// Creates a builder printing `currency_label` in the Currency column.
    #[inline]
    #[must_use]
    pub fn new<T: Into<String>>(currency_label: T) -> Self {
        Self {
            currency_label: currency_label.into(),
        }
    }

    /// Renders one titled group table.
    ///
    /// Rows follow the subset's order. A bold subtotal row over the
    /// subset is appended when it has more than one entry.
    #[inline]
    #[must_use]
    pub fn group_table(&self, title: &str, subset: &TagTotals) -> String {
        let mut table = Table::amounts("Tag");
        for (tag, total) in subset.iter() {
            table.push_row([tag.to_owned(), self.currency_label.clone(), format_amount(total)]);
        }
        if subset.len() > 1 {
            table.push_subtotal_row([
                "Subtotal".to_owned(),
                self.currency_label.clone(),
                format_amount(subset.sum()),
            ]);
        }
        format!("{}{table}", render_fragment(&Heading { title }))
    }

    /// Renders the general summary.
    ///
    /// The three summary rows are shown only when the report's tag-totals
    /// mapping has more than one entry (`has_tag_data`); otherwise a
    /// "no data" notice is rendered. When tag data exists but `summary`
    /// is `None` a notice says the figures are unavailable.
    #[inline]
    #[must_use]
    pub fn summary_table(&self, summary: Option<&SummaryTotals>, has_tag_data: bool) -> String {
        let body = match (has_tag_data, summary) {
            (false, _) => render_fragment(&Notice {
                message: NO_DATA_MESSAGE,
            }),
            (true, None) => render_fragment(&Notice {
                message: SUMMARY_UNAVAILABLE_MESSAGE,
            }),
            (true, Some(totals)) => {
                let mut table = Table::amounts("Description");
                for (label, value) in totals.lines() {
                    table.push_row([label.to_owned(), self.currency_label.clone(), format_amount(value)]);
                }
                table.to_string()
            }
        };
        format!("<h2>General Summary</h2>{body}")
    }

    /// Renders the complete, self-contained HTML document.
    ///
    /// One table per group in order (tags without a total are skipped),
    /// followed by the general summary.
    #[inline]
    #[must_use]
    pub fn document(
        &self,
        groups: &[TagGroup],
        totals: &TagTotals,
        summary: Option<&SummaryTotals>,
        window: &ReportWindow,
    ) -> String {
        let tables: String = groups
            .iter()
            .map(|group| self.group_table(&group.title, &totals.subset(&group.tags)))
            .collect();
        let summary_html = self.summary_table(summary, totals.len() > 1);
        let heading = format!("Monthly Report for {window}");

        format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{heading}</title>\n\
             <style>{STYLE}</style>\n</head>\n<body>\n<div class=\"container\">\n\
             <h1>{heading}</h1>\n<h2>Expense Categories</h2>\n{tables}\n{summary_html}\n\
             </div>\n</body>\n</html>\n"
        )
    }
}
