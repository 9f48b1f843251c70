use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

static TABLE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());
static ROW_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static CELL_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td, th").unwrap());
static DIV_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div[class]").unwrap());
static DATA_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)data|registration|vehicle").unwrap());

/// One row of a scraped grid: ordered cell texts, whitespace-collapsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    cells: Vec<String>,
}

impl Row {
    pub fn new(cells: Vec<String>) -> Self {
        Row { cells }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cell(&self, idx: usize) -> Option<&str> {
        self.cells.get(idx).map(String::as_str)
    }

    pub fn cells(&self) -> &[String] {
        &self.cells
    }
}

/// A grouping of rows; the first row is conventionally a header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub rows: Vec<Row>,
}

impl Table {
    pub fn from_rows<I, R, S>(rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Table {
            rows: rows
                .into_iter()
                .map(|r| Row::new(r.into_iter().map(Into::into).collect()))
                .collect(),
        }
    }

    /// All cell text, lower-cased, for keyword relevance checks.
    pub fn text_lower(&self) -> String {
        self.rows
            .iter()
            .flat_map(|r| r.cells.iter())
            .map(|c| c.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Every `<table>` in the document, rows from `<tr>`, cells from `<td>`/`<th>`.
pub fn parse_tables(html: &str) -> Vec<Table> {
    let doc = Html::parse_document(html);
    doc.select(&TABLE_SEL)
        .map(|table| Table {
            rows: table
                .select(&ROW_SEL)
                .map(|tr| Row::new(tr.select(&CELL_SEL).map(element_text).collect()))
                .collect(),
        })
        .collect()
}

/// Secondary document shape: `div` containers whose class names mention
/// data/registration/vehicle. Each child element is a row and that child's
/// own children are the cells.
pub fn parse_div_grids(html: &str) -> Vec<Table> {
    let doc = Html::parse_document(html);
    doc.select(&DIV_SEL)
        .filter(|div| {
            div.value()
                .attr("class")
                .is_some_and(|c| DATA_CLASS_RE.is_match(c))
        })
        .map(|div| Table {
            rows: child_elements(div)
                .map(|row| Row::new(child_elements(row).map(element_text).collect()))
                .filter(|row| !row.is_empty())
                .collect(),
        })
        .filter(|t| !t.rows.is_empty())
        .collect()
}

fn child_elements<'a>(el: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    el.children().filter_map(ElementRef::wrap)
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
