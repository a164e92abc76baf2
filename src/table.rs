use std::borrow::Borrow;
use std::fmt;
use std::ops::Range;

use tracing::trace;

use crate::domain::{DEFAULT_ITEMS_PER_PAGE, RowId, WardError};

/// A record that can be shown by the [`TableEngine`].
pub trait Row {
    fn id(&self) -> RowId;
}

/// Value produced by a column accessor.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Bool(bool),
    Int(i64),
    Text(String),
    List(Vec<String>),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Int(i) => write!(f, "{i}"),
            CellValue::Text(s) => f.write_str(s),
            CellValue::List(items) => f.write_str(&items.join(", ")),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Int(i)
    }
}

impl From<Vec<String>> for CellValue {
    fn from(items: Vec<String>) -> Self {
        CellValue::List(items)
    }
}

impl<V: Into<CellValue>> From<Option<V>> for CellValue {
    fn from(v: Option<V>) -> Self {
        v.map(Into::into).unwrap_or(CellValue::Empty)
    }
}

pub type Accessor<T> = Box<dyn Fn(&T) -> CellValue + Send + Sync>;
pub type CellRenderer<T> = Box<dyn Fn(&CellValue, &T) -> String + Send + Sync>;
pub type RowActions<T> = Box<dyn Fn(&T) -> String + Send + Sync>;

/// Describes how one projection of `T` is labeled and displayed.
pub struct Column<T> {
    header: String,
    accessor: Accessor<T>,
    render: Option<CellRenderer<T>>,
}

impl<T> Column<T> {
    pub fn new(
        header: impl Into<String>,
        accessor: impl Fn(&T) -> CellValue + Send + Sync + 'static,
    ) -> Self {
        Self {
            header: header.into(),
            accessor: Box::new(accessor),
            render: None,
        }
    }

    /// Replaces the default text conversion. The renderer receives the
    /// accessed value and the whole row.
    pub fn with_render(
        mut self,
        render: impl Fn(&CellValue, &T) -> String + Send + Sync + 'static,
    ) -> Self {
        self.render = Some(Box::new(render));
        self
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn value(&self, row: &T) -> CellValue {
        (self.accessor)(row)
    }

    pub fn cell(&self, row: &T) -> String {
        let value = self.value(row);
        match &self.render {
            Some(render) => render(&value, row),
            None => value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageControl {
    pub number: usize,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedRow {
    pub id: RowId,
    pub cells: Vec<String>,
    pub actions: Option<String>,
}

/// Everything the ui needs to draw one page of a table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TablePage {
    pub headers: Vec<String>,
    pub rows: Vec<RenderedRow>,
    pub top_content: Option<String>,
    pub pages: Vec<PageControl>,
    pub current_page: usize,
    pub total_pages: usize,
    pub previous_enabled: bool,
    pub next_enabled: bool,
    pub summary: String,
    pub total_rows: usize,
}

/// Paginated table over a caller owned row collection.
///
/// The engine never stores rows. The only state it keeps is the current page
/// (1-based), which is clamped back into range whenever a view is computed
/// for a collection that shrank.
pub struct TableEngine<T> {
    columns: Vec<Column<T>>,
    actions: Option<RowActions<T>>,
    items_per_page: usize,
    current_page: usize,
}

impl<T: Row> TableEngine<T> {
    pub fn new(columns: Vec<Column<T>>) -> Result<Self, WardError> {
        if columns.is_empty() {
            return Err(WardError::InvalidSchema(
                "a table needs at least one column".into(),
            ));
        }
        Ok(Self {
            columns,
            actions: None,
            items_per_page: DEFAULT_ITEMS_PER_PAGE,
            current_page: 1,
        })
    }

    /// Adds an "Actions" column rendered once per visible row.
    pub fn with_actions(mut self, actions: impl Fn(&T) -> String + Send + Sync + 'static) -> Self {
        self.actions = Some(Box::new(actions));
        self
    }

    pub fn with_items_per_page(mut self, items_per_page: usize) -> Result<Self, WardError> {
        if items_per_page == 0 {
            return Err(WardError::InvalidSchema(
                "items per page must be positive".into(),
            ));
        }
        self.items_per_page = items_per_page;
        Ok(self)
    }

    pub fn columns(&self) -> &[Column<T>] {
        &self.columns
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn headers(&self) -> Vec<String> {
        let mut headers: Vec<String> = self.columns.iter().map(|c| c.header.clone()).collect();
        if self.actions.is_some() {
            headers.push("Actions".to_string());
        }
        headers
    }

    pub fn total_pages(&self, len: usize) -> usize {
        len.div_ceil(self.items_per_page)
    }

    /// Index range of the current page. Empty if the page is out of range.
    pub fn page_range(&self, len: usize) -> Range<usize> {
        let start = ((self.current_page - 1) * self.items_per_page).min(len);
        let end = (start + self.items_per_page).min(len);
        start..end
    }

    pub fn reset(&mut self) {
        self.current_page = 1;
    }

    pub fn next_page(&mut self, len: usize) -> bool {
        self.goto_page(self.current_page + 1, len)
    }

    pub fn previous_page(&mut self) -> bool {
        if self.current_page > 1 {
            self.current_page -= 1;
            true
        } else {
            false
        }
    }

    pub fn goto_page(&mut self, page: usize, len: usize) -> bool {
        if page >= 1 && page <= self.total_pages(len) && page != self.current_page {
            self.current_page = page;
            true
        } else {
            false
        }
    }

    fn clamp(&mut self, len: usize) {
        let last = self.total_pages(len).max(1);
        if self.current_page > last {
            trace!("Clamping page {} to {}", self.current_page, last);
            self.current_page = last;
        }
    }

    pub fn view<R: Borrow<T>>(&mut self, data: &[R], top_content: Option<String>) -> TablePage {
        self.clamp(data.len());

        let total_rows = data.len();
        let total_pages = self.total_pages(total_rows);
        let range = self.page_range(total_rows);

        let rows = data[range.clone()]
            .iter()
            .map(|r| {
                let row = r.borrow();
                RenderedRow {
                    id: row.id(),
                    cells: self.columns.iter().map(|c| c.cell(row)).collect(),
                    actions: self.actions.as_ref().map(|actions| actions(row)),
                }
            })
            .collect();

        let pages = (1..=total_pages)
            .map(|number| PageControl {
                number,
                active: number == self.current_page,
            })
            .collect();

        trace!(
            "Table view: page {}/{}, rows {:?} of {}",
            self.current_page, total_pages, range, total_rows
        );

        TablePage {
            headers: self.headers(),
            rows,
            top_content,
            pages,
            current_page: self.current_page,
            total_pages,
            previous_enabled: self.current_page > 1,
            next_enabled: self.current_page < total_pages,
            summary: summary(range, total_rows),
            total_rows,
        }
    }
}

fn summary(range: Range<usize>, total: usize) -> String {
    if total == 0 {
        "No results".to_string()
    } else {
        format!(
            "Showing {} to {} of {} results",
            range.start + 1,
            range.end,
            total
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Item {
        id: RowId,
        name: String,
        flag: bool,
    }

    impl Row for Item {
        fn id(&self) -> RowId {
            self.id
        }
    }

    fn items(n: usize) -> Vec<Item> {
        (1..=n as u64)
            .map(|id| Item {
                id,
                name: format!("item {id}"),
                flag: id % 2 == 0,
            })
            .collect()
    }

    fn engine(per_page: usize) -> TableEngine<Item> {
        TableEngine::new(vec![
            Column::new("Name", |i: &Item| i.name.as_str().into()),
            Column::new("Flag", |i: &Item| i.flag.into()),
        ])
        .unwrap()
        .with_items_per_page(per_page)
        .unwrap()
    }

    #[test]
    fn twelve_rows_five_per_page() {
        let data = items(12);
        let mut table = engine(5);

        let sizes: Vec<usize> = (1..=3)
            .map(|p| {
                table.goto_page(p, data.len());
                table.view(&data, None).rows.len()
            })
            .collect();
        assert_eq!(sizes, vec![5, 5, 2]);

        let page = table.view(&data, None);
        assert_eq!(page.current_page, 3);
        assert_eq!(page.rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![11, 12]);
        assert_eq!(page.summary, "Showing 11 to 12 of 12 results");
        assert!(page.previous_enabled);
        assert!(!page.next_enabled);
    }

    #[test]
    fn page_counts_and_slices() {
        for n in 0..=23 {
            for per_page in 1..=6 {
                let data = items(n);
                let mut table = engine(per_page);
                let total = n.div_ceil(per_page);
                assert_eq!(table.view(&data, None).pages.len(), total);

                for p in 1..=total {
                    assert!(p == 1 || table.next_page(data.len()));
                    let page = table.view(&data, None);
                    let expected: Vec<RowId> = data
                        [(p - 1) * per_page..(p * per_page).min(n)]
                        .iter()
                        .map(|i| i.id)
                        .collect();
                    assert_eq!(page.rows.iter().map(|r| r.id).collect::<Vec<_>>(), expected);
                    assert_eq!(page.previous_enabled, p != 1);
                    assert_eq!(page.next_enabled, p != total);
                    if p == total {
                        assert_eq!(page.rows.len(), n - per_page * (total - 1));
                    }
                }
                assert!(!table.next_page(data.len()));
            }
        }
    }

    #[test]
    fn empty_data() {
        let data: Vec<Item> = Vec::new();
        let page = engine(5).view(&data, None);
        assert!(page.rows.is_empty());
        assert!(page.pages.is_empty());
        assert_eq!(page.summary, "No results");
        assert!(!page.previous_enabled);
        assert!(!page.next_enabled);
    }

    #[test]
    fn shrinking_data_clamps_page() {
        let data = items(12);
        let mut table = engine(5);
        table.goto_page(3, data.len());

        let filtered: Vec<&Item> = data.iter().filter(|i| i.id <= 6).collect();
        let page = table.view(&filtered, Some("search: 6".into()));
        assert_eq!(page.current_page, 2);
        assert_eq!(page.rows.len(), 1);
        assert_eq!(page.top_content.as_deref(), Some("search: 6"));
    }

    #[test]
    fn renderer_and_actions() {
        let data = items(2);
        let mut table = TableEngine::new(vec![
            Column::new("Flag", |i: &Item| i.flag.into()).with_render(|v, row: &Item| {
                match v {
                    CellValue::Bool(true) => format!("yes ({})", row.id),
                    _ => "no".to_string(),
                }
            }),
            Column::new("Missing", |_: &Item| CellValue::Empty),
        ])
        .unwrap()
        .with_actions(|i: &Item| format!("edit #{}", i.id));

        let page = table.view(&data, None);
        assert_eq!(page.headers, vec!["Flag", "Missing", "Actions"]);
        assert_eq!(page.rows[0].cells, vec!["no", ""]);
        assert_eq!(page.rows[1].cells, vec!["yes (2)", ""]);
        assert_eq!(page.rows[1].actions.as_deref(), Some("edit #2"));
    }

    #[test]
    fn invalid_construction() {
        assert!(TableEngine::<Item>::new(Vec::new()).is_err());
        assert!(engine(1).with_items_per_page(0).is_err());
    }

    #[test]
    fn previous_stops_at_first_page() {
        let mut table = engine(5);
        assert!(!table.previous_page());
        assert!(!table.goto_page(0, 12));
        assert!(!table.goto_page(4, 12));
        assert_eq!(table.current_page(), 1);
    }
}
