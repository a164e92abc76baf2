use std::path::Path;

use rayon::prelude::*;
use tracing::{debug, info, trace, warn};

use crate::domain::{Role, RowId, WardError};
use crate::form::{Draft, FieldSchema};
use crate::loader::load_records;
use crate::records::{Appointment, Medication, Patient, Record, StaffMember};
use crate::repository::{InMemoryRepository, Repository};
use crate::table::{Row, TableEngine, TablePage};

/// What a role may do on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Access {
    pub create: bool,
    pub edit: bool,
    pub delete: bool,
}

impl Access {
    pub const FULL: Access = Access {
        create: true,
        edit: true,
        delete: true,
    };
    pub const EDIT: Access = Access {
        create: true,
        edit: true,
        delete: false,
    };
    pub const READ_ONLY: Access = Access {
        create: false,
        edit: false,
        delete: false,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveTarget {
    New,
    Existing(RowId),
}

/// Object safe view of a [`Page`] so pages over different record types can
/// live side by side.
pub trait AnyPage {
    fn title(&self) -> &str;
    fn singular(&self) -> &str;
    fn access(&self) -> Access;
    fn fields(&self) -> Vec<FieldSchema>;
    /// Computes the current table page. Clamps the page and cursor.
    fn view(&mut self) -> TablePage;
    fn total_rows(&self) -> usize;
    fn cursor(&self) -> usize;
    fn move_cursor(&mut self, down: bool);
    fn next_page(&mut self) -> bool;
    fn previous_page(&mut self) -> bool;
    fn goto_page(&mut self, page: usize) -> bool;
    fn search_term(&self) -> &str;
    fn set_search(&mut self, term: &str);
    fn sort_next(&mut self);
    fn sort_reverse(&mut self);
    fn selected_id(&self) -> Option<RowId>;
    fn draft_for(&self, id: RowId) -> Option<Draft>;
    fn can_edit(&self, id: RowId) -> bool;
    fn can_delete(&self, id: RowId) -> bool;
    fn save(&mut self, target: SaveTarget, draft: &Draft) -> Result<RowId, WardError>;
    fn delete(&mut self, id: RowId) -> Result<(), WardError>;
    fn row_csv(&self, id: RowId) -> Option<String>;
}

/// One screen: a record collection, its table and its form schema.
pub struct Page<T: Record> {
    title: String,
    singular: String,
    access: Access,
    repo: Box<dyn Repository<T>>,
    table: TableEngine<T>,
    search: String,
    sort: Option<(usize, bool)>,
    order: Vec<usize>, // Indices into repo.all() that pass the search, in display order
    cursor: usize,
}

impl<T: Record> Page<T> {
    pub fn new(
        title: &str,
        singular: &str,
        access: Access,
        repo: Box<dyn Repository<T>>,
        items_per_page: usize,
    ) -> Result<Self, WardError> {
        let table = TableEngine::new(T::columns())?
            .with_items_per_page(items_per_page)?
            .with_actions(move |row: &T| row.actions(access).join(" · "));
        let mut page = Page {
            title: title.to_string(),
            singular: singular.to_string(),
            access,
            repo,
            table,
            search: String::new(),
            sort: None,
            order: Vec::new(),
            cursor: 0,
        };
        page.refresh_order();
        Ok(page)
    }

    fn refresh_order(&mut self) {
        let rows = self.repo.all();
        let term = self.search.to_lowercase();
        let columns = self.table.columns();

        let mut order: Vec<usize> = if term.is_empty() {
            (0..rows.len()).collect()
        } else {
            rows.par_iter()
                .enumerate()
                .filter(|(_, row)| {
                    columns
                        .iter()
                        .any(|c| c.cell(row).to_lowercase().contains(&term))
                })
                .map(|(idx, _)| idx)
                .collect()
        };

        if let Some((column, ascending)) = self.sort {
            let column = &columns[column];
            order.sort_by(|&a, &b| {
                let ord = column.value(&rows[a]).cmp(&column.value(&rows[b]));
                if ascending { ord } else { ord.reverse() }
            });
        }
        trace!("{}: {} of {} rows visible", self.title, order.len(), rows.len());
        self.order = order;
    }

    fn top_content(&self) -> String {
        let mut parts = Vec::new();
        if self.search.is_empty() {
            parts.push("Search: /".to_string());
        } else {
            parts.push(format!("Search: {}", self.search));
        }
        if let Some((column, ascending)) = self.sort {
            let arrow = if ascending { "▲" } else { "▼" };
            parts.push(format!(
                "Sort: {} {arrow}",
                self.table.columns()[column].header()
            ));
        }
        if self.access.create {
            parts.push(format!("[n] New {}", self.singular));
        }
        parts.join("  |  ")
    }

    fn row(&self, id: RowId) -> Option<&T> {
        self.repo.get(id)
    }

    fn page_len(&self) -> usize {
        self.table.page_range(self.order.len()).len()
    }
}

impl<T: Record> AnyPage for Page<T> {
    fn title(&self) -> &str {
        &self.title
    }

    fn singular(&self) -> &str {
        &self.singular
    }

    fn access(&self) -> Access {
        self.access
    }

    fn fields(&self) -> Vec<FieldSchema> {
        T::fields()
    }

    fn view(&mut self) -> TablePage {
        let top = self.top_content();
        let all = self.repo.all();
        let rows: Vec<&T> = self.order.iter().map(|&idx| &all[idx]).collect();
        let page = self.table.view(&rows, Some(top));
        self.cursor = self.cursor.min(page.rows.len().saturating_sub(1));
        page
    }

    fn total_rows(&self) -> usize {
        self.order.len()
    }

    fn cursor(&self) -> usize {
        self.cursor
    }

    fn move_cursor(&mut self, down: bool) {
        let len = self.page_len();
        if down {
            if self.cursor + 1 < len {
                self.cursor += 1;
            } else if self.table.next_page(self.order.len()) {
                self.cursor = 0;
            }
        } else if self.cursor > 0 {
            self.cursor -= 1;
        } else if self.table.previous_page() {
            self.cursor = self.page_len().saturating_sub(1);
        }
    }

    fn next_page(&mut self) -> bool {
        let moved = self.table.next_page(self.order.len());
        if moved {
            self.cursor = 0;
        }
        moved
    }

    fn previous_page(&mut self) -> bool {
        let moved = self.table.previous_page();
        if moved {
            self.cursor = 0;
        }
        moved
    }

    fn goto_page(&mut self, page: usize) -> bool {
        let moved = self.table.goto_page(page, self.order.len());
        if moved {
            self.cursor = 0;
        }
        moved
    }

    fn search_term(&self) -> &str {
        &self.search
    }

    fn set_search(&mut self, term: &str) {
        if self.search != term {
            self.search = term.to_string();
            self.table.reset();
            self.cursor = 0;
            self.refresh_order();
        }
    }

    /// Cycles the sort column, always ascending.
    fn sort_next(&mut self) {
        let n = self.table.columns().len();
        self.sort = match self.sort {
            None => Some((0, true)),
            Some((c, _)) if c + 1 < n => Some((c + 1, true)),
            Some(_) => None,
        };
        self.refresh_order();
    }

    fn sort_reverse(&mut self) {
        self.sort = match self.sort {
            None => Some((0, false)),
            Some((c, ascending)) => Some((c, !ascending)),
        };
        self.refresh_order();
    }

    fn selected_id(&self) -> Option<RowId> {
        let range = self.table.page_range(self.order.len());
        let pos = range.start + self.cursor;
        if !range.contains(&pos) {
            return None;
        }
        self.repo.all().get(self.order[pos]).map(Row::id)
    }

    fn draft_for(&self, id: RowId) -> Option<Draft> {
        self.row(id).map(Record::to_draft)
    }

    fn can_edit(&self, id: RowId) -> bool {
        self.row(id)
            .is_some_and(|r| r.actions(self.access).contains(&"edit"))
    }

    fn can_delete(&self, id: RowId) -> bool {
        self.row(id)
            .is_some_and(|r| r.actions(self.access).contains(&"delete"))
    }

    fn save(&mut self, target: SaveTarget, draft: &Draft) -> Result<RowId, WardError> {
        let id = match target {
            SaveTarget::New => {
                if !self.access.create {
                    return Err(WardError::NotPermitted("creating records"));
                }
                let id = self.repo.next_id();
                self.repo.insert(T::from_draft(id, draft)?);
                info!("{}: created {id}", self.title);
                id
            }
            SaveTarget::Existing(id) => {
                if !self.can_edit(id) {
                    return Err(WardError::NotPermitted("editing this record"));
                }
                self.repo.replace(T::from_draft(id, draft)?)?;
                info!("{}: updated {id}", self.title);
                id
            }
        };
        self.refresh_order();
        Ok(id)
    }

    fn delete(&mut self, id: RowId) -> Result<(), WardError> {
        if !self.can_delete(id) {
            return Err(WardError::NotPermitted("deleting this record"));
        }
        self.repo.remove(id)?;
        info!("{}: deleted {id}", self.title);
        self.refresh_order();
        Ok(())
    }

    fn row_csv(&self, id: RowId) -> Option<String> {
        let row = self.row(id)?;
        let cells: Vec<String> = self
            .table
            .columns()
            .iter()
            .map(|c| wrap_cell_content(&c.cell(row)))
            .collect();
        Some(cells.join(","))
    }
}

fn wrap_cell_content(c: &str) -> String {
    let needs_escaping = c.contains('"');
    let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',');
    let mut out = String::from(c);

    if needs_escaping {
        out = out.replace('"', "\"\"");
    }
    if needs_wrapping || needs_escaping {
        out = format!("\"{out}\"");
    }
    out
}

fn page_for<T: Record>(
    title: &str,
    singular: &str,
    access: Access,
    data_dir: &Path,
    items_per_page: usize,
) -> Result<Box<dyn AnyPage>, WardError> {
    let rows = load_records::<T>(data_dir)?;
    debug!("{title}: loaded {} rows", rows.len());
    let repo = Box::new(InMemoryRepository::new(rows));
    let page: Box<dyn AnyPage> = Box::new(Page::new(title, singular, access, repo, items_per_page)?);
    Ok(page)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Patients,
    Appointments,
    Medications,
    Staff,
}

/// Which pages a role sees, and with which permissions.
pub fn routes(role: Role) -> Vec<(PageKind, Access)> {
    use PageKind::*;
    match role {
        Role::Admin => vec![
            (Patients, Access::FULL),
            (Appointments, Access::FULL),
            (Medications, Access::FULL),
            (Staff, Access::FULL),
        ],
        Role::Doctor => vec![
            (Patients, Access::EDIT),
            (Appointments, Access::FULL),
            (Medications, Access::READ_ONLY),
        ],
        Role::Nurse => vec![
            (Patients, Access::EDIT),
            (Medications, Access::READ_ONLY),
            (Appointments, Access::READ_ONLY),
        ],
        Role::Pharmacist => vec![(Medications, Access::FULL), (Patients, Access::READ_ONLY)],
        Role::Receptionist => vec![
            (Appointments, Access::FULL),
            (Patients, Access::EDIT),
            (Staff, Access::READ_ONLY),
        ],
        Role::Therapist => vec![(Appointments, Access::EDIT), (Patients, Access::READ_ONLY)],
        Role::Patient => vec![(Appointments, Access::READ_ONLY)],
    }
}

pub fn mount_pages(
    role: Role,
    data_dir: &Path,
    items_per_page: usize,
) -> Result<Vec<Box<dyn AnyPage>>, WardError> {
    let pages = routes(role)
        .into_iter()
        .map(|(kind, access)| match kind {
            PageKind::Patients => {
                page_for::<Patient>("Patients", "patient", access, data_dir, items_per_page)
            }
            PageKind::Appointments => page_for::<Appointment>(
                "Appointments",
                "appointment",
                access,
                data_dir,
                items_per_page,
            ),
            PageKind::Medications => {
                page_for::<Medication>("Medications", "medication", access, data_dir, items_per_page)
            }
            PageKind::Staff => {
                page_for::<StaffMember>("Staff", "staff member", access, data_dir, items_per_page)
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    if pages.is_empty() {
        warn!("No pages mounted for {role:?}");
    }
    Ok(pages)
}
