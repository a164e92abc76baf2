use arboard::Clipboard;
use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::domain::{HELP_TEXT, Message, RowId, WardConfig, WardError, expand_path};
use crate::form::{FieldKind, FieldSchema, FieldValue, FormEngine, FormMode, SubmitOutcome};
use crate::inputter::{InputResult, Inputter};
use crate::page::{AnyPage, SaveTarget, mount_pages};
use crate::table::TablePage;

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modus {
    TABLE,
    FORM,
    POPUP,
    CONFIRM,
    CMDINPUT,
}

/// One form field as the ui draws it.
#[derive(Debug, Clone)]
pub struct FieldView {
    pub label: String,
    pub kind: FieldKind,
    pub value: String,
    pub options: Vec<(String, bool)>, // Checkbox group options and their state
    pub required: bool,
    pub disabled: bool,
    pub focused: bool,
    pub option_focus: Option<usize>,
    pub preview: Option<String>,
    pub input: Option<InputResult>, // Text being typed while the field has focus
}

#[derive(Debug, Clone)]
pub struct FormView {
    pub title: String,
    pub mode: FormMode,
    pub fields: Vec<FieldView>,
    pub save_focused: bool,
    pub problems: Vec<String>,
}

pub struct UIData {
    pub role: String,
    pub tabs: Vec<String>,
    pub active_tab: usize,
    pub table: Option<TablePage>,
    pub selected_row: usize,
    pub show_popup: bool,
    pub popup_message: String,
    pub confirm_message: Option<String>,
    pub cmdinput: Option<InputResult>,
    pub form: Option<FormView>,
    pub last_update: Instant,
    pub status_message: String,
    pub last_status_message_update: Instant,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            role: String::new(),
            tabs: Vec::new(),
            active_tab: 0,
            table: None,
            selected_row: 0,
            show_popup: false,
            popup_message: String::new(),
            confirm_message: None,
            cmdinput: None,
            form: None,
            last_update: Instant::now(),
            status_message: String::new(),
            last_status_message_update: Instant::now(),
        }
    }
}

pub struct Model {
    config: WardConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    pages: Vec<Box<dyn AnyPage>>,
    active: usize,
    form: FormEngine,
    save_target: SaveTarget,
    form_problems: Vec<String>,
    input: Inputter,
    last_input: InputResult,
    search_backup: String,
    pending_delete: Option<RowId>,
    uidata: UIData,
    clipboard: Option<Clipboard>, // Created on first copy, there is no clipboard on headless systems
    status_message: String,
    last_status_message_update: Instant,
}

impl Model {
    pub fn init(config: &WardConfig) -> Result<Self, WardError> {
        let pages = mount_pages(config.role, &config.data_dir, config.items_per_page)?;
        info!(
            "Mounted {} pages for {}",
            pages.len(),
            config.role.label()
        );
        Ok(Self::with_pages(config, pages))
    }

    pub fn with_pages(config: &WardConfig, pages: Vec<Box<dyn AnyPage>>) -> Self {
        let mut model = Self {
            config: config.clone(),
            status: Status::READY,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            pages,
            active: 0,
            form: FormEngine::new(),
            save_target: SaveTarget::New,
            form_problems: Vec::new(),
            input: Inputter::default(),
            last_input: InputResult::default(),
            search_backup: String::new(),
            pending_delete: None,
            uidata: UIData::empty(),
            clipboard: None,
            status_message: String::new(),
            last_status_message_update: Instant::now(),
        };
        model.set_status_message(format!(
            "Signed in as {}. Press ? for help.",
            config.role.label()
        ));
        model.update_uidata();
        model
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    pub fn modus(&self) -> Modus {
        self.modus
    }

    pub fn raw_keyevents(&self) -> bool {
        matches!(self.modus, Modus::FORM | Modus::CMDINPUT)
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), WardError> {
        let mut changed = self.form.poll_previews() > 0;

        if let Some(msg) = message {
            trace!("Update: Modus {:?}, Message {:?}", self.modus, msg);
            match self.modus {
                Modus::TABLE => match msg {
                    Message::Quit => self.quit(),
                    Message::MoveDown => {
                        self.with_page(|p| p.move_cursor(true));
                    }
                    Message::MoveUp => {
                        self.with_page(|p| p.move_cursor(false));
                    }
                    Message::NextPage => {
                        if !self.with_page(|p| p.next_page()).unwrap_or(false) {
                            self.set_status_message("Already on the last page");
                        }
                    }
                    Message::PreviousPage => {
                        if !self.with_page(|p| p.previous_page()).unwrap_or(false) {
                            self.set_status_message("Already on the first page");
                        }
                    }
                    Message::GotoPage(page) => {
                        let moved = self.with_page(|p| p.goto_page(page)).unwrap_or(false);
                        let exists = self
                            .uidata
                            .table
                            .as_ref()
                            .is_some_and(|t| page <= t.total_pages);
                        if !moved && !exists {
                            self.set_status_message(format!("There is no page {page}"));
                        }
                    }
                    Message::NextTab => self.switch_tab(true),
                    Message::PreviousTab => self.switch_tab(false),
                    Message::Create => self.open_create(),
                    Message::Edit => self.open_edit(),
                    Message::Delete => self.ask_delete(),
                    Message::Search => self.enter_cmd_mode(),
                    Message::SortNext => {
                        self.with_page(|p| p.sort_next());
                    }
                    Message::SortReverse => {
                        self.with_page(|p| p.sort_reverse());
                    }
                    Message::CopyRow => self.copy_row(),
                    Message::Help => self.show_help(),
                    Message::Exit => self.exit(),
                    _ => (),
                },
                Modus::POPUP => match msg {
                    Message::Quit => self.quit(),
                    Message::Exit | Message::Help | Message::Confirm => self.exit(),
                    _ => (),
                },
                Modus::CONFIRM => match msg {
                    Message::Confirm => self.confirm_delete(),
                    Message::Exit | Message::Quit => self.exit(),
                    _ => (),
                },
                Modus::FORM => {
                    if let Message::RawKey(key) = msg {
                        self.form_input(key)
                    }
                }
                Modus::CMDINPUT => {
                    if let Message::RawKey(key) = msg {
                        self.raw_input(key)
                    }
                }
            }
            changed = true;
        }

        if changed {
            self.update_uidata();
        }
        Ok(())
    }

    // -------------------- Control handling functions ---------------------- //

    fn with_page<R>(&mut self, f: impl FnOnce(&mut Box<dyn AnyPage>) -> R) -> Option<R> {
        self.pages.get_mut(self.active).map(f)
    }

    fn exit(&mut self) {
        match self.modus {
            Modus::TABLE => {
                let had_search = self
                    .pages
                    .get(self.active)
                    .is_some_and(|p| !p.search_term().is_empty());
                if had_search {
                    self.with_page(|p| p.set_search(""));
                    self.set_status_message("Search cleared");
                }
            }
            Modus::POPUP => {
                trace!("Close popup ...");
                self.modus = self.previous_modus;
                self.previous_modus = Modus::POPUP;
            }
            Modus::CONFIRM => {
                self.pending_delete = None;
                self.modus = Modus::TABLE;
                self.set_status_message("Delete cancelled");
            }
            Modus::FORM => {
                self.form.close();
                self.form_problems.clear();
                self.modus = Modus::TABLE;
                self.set_status_message("Changes discarded");
            }
            Modus::CMDINPUT => {}
        }
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
    }

    fn switch_tab(&mut self, forward: bool) {
        let n = self.pages.len();
        if n == 0 {
            return;
        }
        self.active = if forward {
            (self.active + 1) % n
        } else {
            (self.active + n - 1) % n
        };
        debug!("Switched to {}", self.pages[self.active].title());
    }

    fn open_create(&mut self) {
        let Some(page) = self.pages.get(self.active) else {
            return;
        };
        if !page.access().create {
            let message = format!("{} is read only for you", page.title());
            self.set_status_message(message);
            return;
        }
        let title = format!("New {}", page.singular());
        self.form.open_create(&title, page.fields());
        self.save_target = SaveTarget::New;
        self.enter_form();
    }

    fn open_edit(&mut self) {
        let Some(page) = self.pages.get(self.active) else {
            return;
        };
        let Some(id) = page.selected_id() else {
            self.set_status_message("Nothing selected");
            return;
        };
        let Some(draft) = page.draft_for(id).filter(|_| page.can_edit(id)) else {
            let message = format!("This {} cannot be edited", page.singular());
            self.set_status_message(message);
            return;
        };
        let title = format!("Edit {}", page.singular());
        self.form.open_edit(&title, page.fields(), draft);
        self.save_target = SaveTarget::Existing(id);
        self.enter_form();
    }

    fn enter_form(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::FORM;
        self.form_problems.clear();
        self.bind_input();
    }

    fn ask_delete(&mut self) {
        let Some(page) = self.pages.get(self.active) else {
            return;
        };
        match page.selected_id() {
            Some(id) if page.can_delete(id) => {
                self.pending_delete = Some(id);
                self.previous_modus = self.modus;
                self.modus = Modus::CONFIRM;
            }
            Some(_) => {
                let message = format!("This {} cannot be deleted", page.singular());
                self.set_status_message(message);
            }
            None => self.set_status_message("Nothing selected"),
        }
    }

    fn confirm_delete(&mut self) {
        self.modus = Modus::TABLE;
        let Some(id) = self.pending_delete.take() else {
            return;
        };
        let Some(page) = self.pages.get_mut(self.active) else {
            return;
        };
        let message = match page.delete(id) {
            Ok(()) => format!("Deleted {} {id}", page.singular()),
            Err(e) => {
                warn!("Delete of {id} failed: {e}");
                format!("Delete failed: {e}")
            }
        };
        self.set_status_message(message);
    }

    fn copy_row(&mut self) {
        let Some(row) = self
            .pages
            .get(self.active)
            .and_then(|p| p.selected_id().and_then(|id| p.row_csv(id)))
        else {
            self.set_status_message("Nothing selected");
            return;
        };
        trace!("Row content: {row}");

        if self.clipboard.is_none() {
            match Clipboard::new() {
                Ok(clipboard) => self.clipboard = Some(clipboard),
                Err(e) => {
                    warn!("No clipboard available: {e:?}");
                    self.set_status_message("No clipboard available");
                    return;
                }
            }
        }
        if let Some(clipboard) = self.clipboard.as_mut() {
            match clipboard.set_text(row) {
                Ok(_) => self.set_status_message("Copied row to clipboard"),
                Err(e) => {
                    warn!("Error copying to clipboard: {e:?}");
                    self.set_status_message("Copying to clipboard failed");
                }
            }
        }
    }

    // -------------------- Search input ---------------------- //

    fn enter_cmd_mode(&mut self) {
        trace!("Entering search mode ...");
        self.search_backup = self
            .pages
            .get(self.active)
            .map(|p| p.search_term().to_string())
            .unwrap_or_default();
        self.previous_modus = self.modus;
        self.modus = Modus::CMDINPUT;
        self.input.set(&self.search_backup);
        self.last_input = self.input.get();
    }

    fn raw_input(&mut self, key: KeyEvent) {
        self.last_input = self.input.read(key);
        if self.last_input.canceled {
            let previous = std::mem::take(&mut self.search_backup);
            self.with_page(|p| p.set_search(&previous));
            self.modus = self.previous_modus;
            self.previous_modus = Modus::CMDINPUT;
            return;
        }

        let term = self.last_input.input.clone();
        let found = self
            .with_page(|p| {
                p.set_search(&term);
                p.total_rows()
            })
            .unwrap_or(0);

        if self.last_input.finished {
            trace!("Search for \"{term}\" finished");
            self.modus = self.previous_modus;
            self.previous_modus = Modus::CMDINPUT;
            if term.is_empty() {
                self.set_status_message("Search cleared");
            } else if found == 0 {
                self.set_status_message("Found no matches!");
            } else {
                self.set_status_message(format!("Found {found} results"));
            }
        }
    }

    // -------------------- Form input ---------------------- //

    fn form_input(&mut self, key: KeyEvent) {
        match (key.code, key.modifiers) {
            (KeyCode::Esc, _) => return self.exit(),
            (KeyCode::Char('s'), KeyModifiers::CONTROL) => return self.submit_form(),
            (KeyCode::Tab, _) | (KeyCode::Down, _) => {
                self.form.focus_next();
                return self.bind_input();
            }
            (KeyCode::BackTab, _) | (KeyCode::Up, _) => {
                self.form.focus_previous();
                return self.bind_input();
            }
            _ => {}
        }

        let Some(field) = self.form.focused_field().cloned() else {
            // Focus is on the save button
            if matches!(key.code, KeyCode::Enter | KeyCode::Char(' ')) {
                self.submit_form();
            }
            return;
        };
        let name = field.name.as_str();
        match field.kind {
            FieldKind::Checkbox => {
                if matches!(key.code, KeyCode::Char(' ') | KeyCode::Enter) {
                    self.form.toggle(name);
                }
            }
            FieldKind::CheckboxGroup => match key.code {
                KeyCode::Left => self.form.focus_option(false),
                KeyCode::Right => self.form.focus_option(true),
                KeyCode::Char(' ') | KeyCode::Enter => {
                    if let Some(option) = field.options.get(self.form.option_focus()) {
                        self.form.toggle_option(name, &option.value);
                    }
                }
                _ => {}
            },
            FieldKind::Select => match key.code {
                KeyCode::Left => {
                    self.form.cycle_select(name, false);
                }
                KeyCode::Right | KeyCode::Char(' ') => {
                    self.form.cycle_select(name, true);
                }
                _ => {}
            },
            FieldKind::File if key.code == KeyCode::Enter => self.choose_file(&field),
            _ if key.code == KeyCode::Enter => {
                self.form.focus_next();
                self.bind_input();
            }
            _ => self.edit_text(&field, key),
        }
    }

    /// Loads the focused text field's value into the inputter.
    fn bind_input(&mut self) {
        self.input.clear();
        if let Some(field) = self.form.focused_field() {
            match self.form.draft().get(&field.name) {
                Some(FieldValue::Text(s)) if field.kind.is_text_input() => self.input.set(s),
                Some(FieldValue::File(handle)) => self.input.set(&handle.path.to_string_lossy()),
                _ => {}
            }
        }
        self.last_input = self.input.get();
    }

    fn edit_text(&mut self, field: &FieldSchema, key: KeyEvent) {
        if self.form.is_disabled(field) {
            self.set_status_message(format!("{} cannot be changed", field.label));
            return;
        }
        self.last_input = self.input.read(key);
        // File fields keep their handle until the typed path is confirmed
        if field.kind != FieldKind::File {
            self.form.set_text(&field.name, &self.last_input.input);
        }
    }

    fn choose_file(&mut self, field: &FieldSchema) {
        if self.form.is_disabled(field) {
            self.set_status_message(format!("{} cannot be changed", field.label));
            return;
        }
        let raw = self.last_input.input.trim().to_string();
        if raw.is_empty() {
            if self.form.clear_file(&field.name) {
                self.set_status_message(format!("Cleared {}", field.label));
            }
            return;
        }
        match expand_path(&raw).and_then(|path| self.form.select_file(&field.name, &path)) {
            Ok(()) => self.set_status_message(format!("Selected {raw}")),
            Err(e) => {
                warn!("Selecting {raw} for {} failed: {e}", field.name);
                self.set_status_message(format!("{}: {e}", field.label));
            }
        }
    }

    fn submit_form(&mut self) {
        let Some(page) = self.pages.get_mut(self.active) else {
            return;
        };
        let target = self.save_target;
        let mut saved = None;
        let outcome = self
            .form
            .submit(|draft| saved = Some(page.save(target, &draft)));

        match outcome {
            SubmitOutcome::Blocked(problems) => {
                let message = format!("Cannot save: {}", problems.join(", "));
                self.form_problems = problems;
                self.set_status_message(message);
            }
            SubmitOutcome::Saved => {
                self.modus = Modus::TABLE;
                self.form_problems.clear();
                let message = match saved {
                    Some(Ok(id)) => format!("Saved {} {id}", self.pages[self.active].singular()),
                    Some(Err(e)) => {
                        warn!("Saving failed: {e}");
                        format!("Save failed: {e}")
                    }
                    None => return,
                };
                self.set_status_message(message);
            }
            SubmitOutcome::NotOpen => self.modus = Modus::TABLE,
        }
    }

    // -------------------- UI data ---------------------- //

    fn form_view(&self) -> Option<FormView> {
        let mode = self.form.mode()?;
        let focus = self.form.focus();
        let fields = self
            .form
            .fields()
            .iter()
            .enumerate()
            .map(|(idx, field)| {
                let focused = idx == focus;
                let disabled = self.form.is_disabled(field);
                let options = match self.form.draft().get(&field.name) {
                    Some(FieldValue::Group(group)) if field.kind == FieldKind::CheckboxGroup => {
                        field
                            .options
                            .iter()
                            .map(|o| (o.label.clone(), group.get(&o.value) == Some(&true)))
                            .collect()
                    }
                    _ if field.kind == FieldKind::CheckboxGroup => field
                        .options
                        .iter()
                        .map(|o| (o.label.clone(), false))
                        .collect(),
                    _ => Vec::new(),
                };
                let preview = if let Some(url) = self.form.preview(&field.name) {
                    Some(format!("preview: {}…", url.chars().take(40).collect::<String>()))
                } else if self.form.preview_pending(&field.name) {
                    Some("loading preview ...".to_string())
                } else {
                    None
                };
                FieldView {
                    label: field.label.clone(),
                    kind: field.kind,
                    value: self.form.display_value(field),
                    options,
                    required: field.required,
                    disabled,
                    focused,
                    option_focus: (focused && field.kind == FieldKind::CheckboxGroup)
                        .then(|| self.form.option_focus()),
                    preview,
                    input: (focused && field.kind.is_text_input() && !disabled)
                        .then(|| self.last_input.clone()),
                }
            })
            .collect();

        Some(FormView {
            title: self.form.title().to_string(),
            mode,
            fields,
            save_focused: focus == self.form.fields().len(),
            problems: self.form_problems.clone(),
        })
    }

    fn update_uidata(&mut self) {
        let table = self.pages.get_mut(self.active).map(|p| p.view());
        let page = self.pages.get(self.active);
        let confirm_message = match (self.modus, page) {
            (Modus::CONFIRM, Some(page)) => Some(format!(
                "Delete this {}? [y] yes  [n] no",
                page.singular()
            )),
            _ => None,
        };

        self.uidata = UIData {
            role: self.config.role.label().to_string(),
            tabs: self.pages.iter().map(|p| p.title().to_string()).collect(),
            active_tab: self.active,
            table,
            selected_row: page.map(|p| p.cursor()).unwrap_or(0),
            show_popup: self.modus == Modus::POPUP,
            popup_message: HELP_TEXT.to_string(),
            confirm_message,
            cmdinput: (self.modus == Modus::CMDINPUT).then(|| self.last_input.clone()),
            form: self.form_view(),
            last_update: Instant::now(),
            status_message: self.status_message.clone(),
            last_status_message_update: self.last_status_message_update,
        }
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.last_status_message_update = Instant::now();
        self.uidata.status_message = self.status_message.clone();
        self.uidata.last_status_message_update = self.last_status_message_update;
        self.uidata.last_update = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::Access;
    use crate::page::tests::medication_page;

    fn model(access: Access) -> Model {
        let page: Box<dyn AnyPage> = Box::new(medication_page(7, access));
        Model::with_pages(&WardConfig::default(), vec![page])
    }

    fn key(model: &mut Model, code: KeyCode) {
        model
            .update(Some(Message::RawKey(KeyEvent::new(code, KeyModifiers::NONE))))
            .unwrap();
    }

    fn type_str(model: &mut Model, s: &str) {
        for c in s.chars() {
            key(model, KeyCode::Char(c));
        }
    }

    fn save(model: &mut Model) {
        model
            .update(Some(Message::RawKey(KeyEvent::new(
                KeyCode::Char('s'),
                KeyModifiers::CONTROL,
            ))))
            .unwrap();
    }

    fn send(model: &mut Model, message: Message) {
        model.update(Some(message)).unwrap();
    }

    fn table(model: &Model) -> &TablePage {
        model.get_uidata().table.as_ref().unwrap()
    }

    #[test]
    fn create_through_the_form() {
        let mut model = model(Access::FULL);
        send(&mut model, Message::Create);
        assert_eq!(model.modus(), Modus::FORM);
        assert!(model.raw_keyevents());
        assert_eq!(model.get_uidata().form.as_ref().unwrap().title, "New medication");

        type_str(&mut model, "Aspirin");
        key(&mut model, KeyCode::Tab);
        type_str(&mut model, "100mg");
        key(&mut model, KeyCode::Tab);
        key(&mut model, KeyCode::Right); // tablet
        key(&mut model, KeyCode::Tab);
        type_str(&mut model, "40");
        key(&mut model, KeyCode::Tab);
        key(&mut model, KeyCode::Char(' ')); // morning
        save(&mut model);

        assert_eq!(model.modus(), Modus::TABLE);
        assert!(model.get_uidata().form.is_none());
        assert_eq!(table(&model).total_rows, 8);
        assert!(model.get_uidata().status_message.starts_with("Saved medication"));
    }

    #[test]
    fn required_fields_block_save() {
        let mut model = model(Access::FULL);
        send(&mut model, Message::Create);
        save(&mut model);
        assert_eq!(model.modus(), Modus::FORM);
        let form = model.get_uidata().form.as_ref().unwrap();
        assert!(form.problems.contains(&"Name is required".to_string()));
        assert_eq!(table(&model).total_rows, 7);
    }

    #[test]
    fn record_validation_is_reported() {
        let mut model = model(Access::FULL);
        send(&mut model, Message::Create);
        type_str(&mut model, "Aspirin");
        key(&mut model, KeyCode::Tab);
        type_str(&mut model, "100mg");
        key(&mut model, KeyCode::Tab);
        key(&mut model, KeyCode::Tab);
        type_str(&mut model, "40");
        save(&mut model);

        assert_eq!(model.modus(), Modus::TABLE);
        assert!(model.get_uidata().status_message.contains("dosage time"));
        assert_eq!(table(&model).total_rows, 7);
    }

    #[test]
    fn edit_selected_row() {
        let mut model = model(Access::FULL);
        send(&mut model, Message::MoveDown);
        send(&mut model, Message::Edit);
        let form = model.get_uidata().form.as_ref().unwrap();
        assert_eq!(form.title, "Edit medication");
        assert_eq!(form.fields[0].input.as_ref().unwrap().input, "Drug 02");

        key(&mut model, KeyCode::Backspace);
        key(&mut model, KeyCode::Backspace);
        type_str(&mut model, "99");
        save(&mut model);

        assert_eq!(table(&model).rows[1].cells[0], "Drug 99");
        assert_eq!(table(&model).total_rows, 7);
    }

    #[test]
    fn escape_discards_changes() {
        let mut model = model(Access::FULL);
        send(&mut model, Message::Edit);
        type_str(&mut model, " changed");
        key(&mut model, KeyCode::Esc);
        assert_eq!(model.modus(), Modus::TABLE);
        assert_eq!(table(&model).rows[0].cells[0], "Drug 01");
    }

    #[test]
    fn delete_asks_first() {
        let mut model = model(Access::FULL);
        send(&mut model, Message::Delete);
        assert_eq!(model.modus(), Modus::CONFIRM);
        assert!(model.get_uidata().confirm_message.is_some());
        send(&mut model, Message::Exit);
        assert_eq!(table(&model).total_rows, 7);

        send(&mut model, Message::Delete);
        send(&mut model, Message::Confirm);
        assert_eq!(model.modus(), Modus::TABLE);
        assert_eq!(table(&model).total_rows, 6);
        assert_eq!(table(&model).rows[0].cells[0], "Drug 02");
    }

    #[test]
    fn search_is_live_and_cancelable() {
        let mut model = model(Access::FULL);
        send(&mut model, Message::Search);
        assert_eq!(model.modus(), Modus::CMDINPUT);
        type_str(&mut model, "07");
        assert_eq!(table(&model).total_rows, 1);
        key(&mut model, KeyCode::Esc);
        assert_eq!(model.modus(), Modus::TABLE);
        assert_eq!(table(&model).total_rows, 7);

        send(&mut model, Message::Search);
        type_str(&mut model, "07");
        key(&mut model, KeyCode::Enter);
        assert_eq!(table(&model).total_rows, 1);
        assert_eq!(model.get_uidata().status_message, "Found 1 results");

        send(&mut model, Message::Exit);
        assert_eq!(table(&model).total_rows, 7);
    }

    #[test]
    fn read_only_pages_refuse_forms() {
        let mut model = model(Access::READ_ONLY);
        send(&mut model, Message::Create);
        assert_eq!(model.modus(), Modus::TABLE);
        assert!(model.get_uidata().status_message.contains("read only"));
        send(&mut model, Message::Edit);
        assert_eq!(model.modus(), Modus::TABLE);
        send(&mut model, Message::Delete);
        assert_eq!(model.modus(), Modus::TABLE);
    }

    #[test]
    fn paging_and_help() {
        let mut model = model(Access::FULL);
        send(&mut model, Message::NextPage);
        assert_eq!(table(&model).current_page, 2);
        send(&mut model, Message::NextPage);
        assert_eq!(model.get_uidata().status_message, "Already on the last page");
        send(&mut model, Message::GotoPage(1));
        assert_eq!(table(&model).current_page, 1);

        send(&mut model, Message::Help);
        assert!(model.get_uidata().show_popup);
        send(&mut model, Message::Exit);
        assert!(!model.get_uidata().show_popup);

        send(&mut model, Message::Quit);
        assert_eq!(model.status, Status::QUITTING);
    }
}
