use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use derive_setters::Setters;
use tracing::{debug, trace, warn};

use crate::domain::WardError;
use crate::preview::PreviewLoader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Email,
    Number,
    Date,
    Time,
    Select,
    Textarea,
    File,
    Checkbox,
    CheckboxGroup,
}

impl FieldKind {
    /// Kinds whose value is edited as free text.
    pub fn is_text_input(&self) -> bool {
        matches!(
            self,
            FieldKind::Text
                | FieldKind::Email
                | FieldKind::Number
                | FieldKind::Date
                | FieldKind::Time
                | FieldKind::Textarea
                | FieldKind::File
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl From<&str> for SelectOption {
    fn from(s: &str) -> Self {
        SelectOption {
            value: s.to_string(),
            label: s.to_string(),
        }
    }
}

impl From<(&str, &str)> for SelectOption {
    fn from((value, label): (&str, &str)) -> Self {
        SelectOption {
            value: value.to_string(),
            label: label.to_string(),
        }
    }
}

/// A file chosen for a file field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub mime: Option<String>,
}

impl FileHandle {
    pub fn open(path: &Path) -> Result<Self, WardError> {
        let metadata = fs::metadata(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => WardError::FileNotFound(path.to_path_buf()),
            _ => WardError::IoError(e),
        })?;
        if !metadata.is_file() {
            return Err(WardError::FileRejected {
                path: path.to_path_buf(),
                reason: "not a file".into(),
            });
        }
        let mime = infer::get_from_path(path)?.map(|kind| kind.mime_type().to_string());
        Ok(FileHandle {
            path: path.to_path_buf(),
            name: path
                .file_name()
                .and_then(|s| s.to_str())
                .unwrap_or("???")
                .to_string(),
            size: metadata.len(),
            mime,
        })
    }

    pub fn is_image(&self) -> bool {
        self.mime.as_deref().is_some_and(|m| m.starts_with("image/"))
    }

    /// Checks the file against an html style `accept` list such as
    /// `image/*,.pdf`.
    pub fn accepted_by(&self, accept: &str) -> bool {
        let extension = self
            .path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase());
        accept.split(',').map(str::trim).any(|token| {
            if let Some(ext) = token.strip_prefix('.') {
                extension.as_deref() == Some(ext.to_lowercase().as_str())
            } else if let Some(prefix) = token.strip_suffix("/*") {
                self.mime
                    .as_deref()
                    .is_some_and(|m| m.split('/').next() == Some(prefix))
            } else {
                self.mime.as_deref() == Some(token)
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Bool(bool),
    Group(BTreeMap<String, bool>),
    File(FileHandle),
}

impl FieldValue {
    /// Create mode default: checkboxes start unchecked, everything else empty.
    pub fn default_for(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Checkbox => FieldValue::Bool(false),
            _ => FieldValue::Text(String::new()),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

/// Working copy of a record, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft(BTreeMap<String, FieldValue>);

impl Draft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<FieldValue>) {
        self.0.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0.get(name)
    }

    /// Text of a field, empty when missing or not text.
    pub fn text(&self, name: &str) -> &str {
        self.get(name).and_then(FieldValue::as_text).unwrap_or("")
    }

    pub fn flag(&self, name: &str) -> bool {
        matches!(self.get(name), Some(FieldValue::Bool(true)))
    }

    /// Checked options of a checkbox group, sorted by option value.
    pub fn checked(&self, name: &str) -> Vec<String> {
        match self.get(name) {
            Some(FieldValue::Group(options)) => options
                .iter()
                .filter(|(_, on)| **on)
                .map(|(k, _)| k.clone())
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn file(&self, name: &str) -> Option<&FileHandle> {
        match self.get(name) {
            Some(FieldValue::File(handle)) => Some(handle),
            _ => None,
        }
    }

    /// Builds a draft from raw strings, e.g. a csv record. Checkboxes take
    /// `true`/`false`, checkbox groups a `|` separated list of option values.
    pub fn from_strings<'a>(
        fields: &[FieldSchema],
        get: impl Fn(&str) -> Option<&'a str>,
    ) -> Self {
        let mut draft = Draft::new();
        for field in fields {
            let raw = get(&field.name).unwrap_or("").trim();
            let value = match field.kind {
                FieldKind::Checkbox => {
                    FieldValue::Bool(matches!(raw.to_lowercase().as_str(), "true" | "1" | "yes"))
                }
                FieldKind::CheckboxGroup => {
                    let selected: Vec<&str> = raw.split('|').map(str::trim).collect();
                    FieldValue::Group(
                        field
                            .options
                            .iter()
                            .map(|o| (o.value.clone(), selected.contains(&o.value.as_str())))
                            .collect(),
                    )
                }
                _ => FieldValue::Text(raw.to_string()),
            };
            draft.0.insert(field.name.clone(), value);
        }
        draft
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit,
}

impl fmt::Display for FormMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormMode::Create => f.write_str("create"),
            FormMode::Edit => f.write_str("edit"),
        }
    }
}

pub type CustomRender = Arc<dyn Fn(&FieldValue, FormMode) -> String + Send + Sync>;

/// Declarative description of one form field.
#[derive(Clone, Setters)]
pub struct FieldSchema {
    #[setters(skip)]
    pub name: String,
    #[setters(skip)]
    pub label: String,
    #[setters(skip)]
    pub kind: FieldKind,
    #[setters(skip)]
    pub options: Vec<SelectOption>,
    #[setters(bool)]
    pub required: bool,
    #[setters(bool)]
    pub disabled_in_edit: bool,
    #[setters(strip_option, into)]
    pub accept: Option<String>,
    #[setters(strip_option)]
    pub custom_render: Option<CustomRender>,
}

impl fmt::Debug for FieldSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSchema")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("required", &self.required)
            .field("disabled_in_edit", &self.disabled_in_edit)
            .finish_non_exhaustive()
    }
}

impl FieldSchema {
    pub fn new(name: &str, label: &str, kind: FieldKind) -> Self {
        FieldSchema {
            name: name.to_string(),
            label: label.to_string(),
            kind,
            options: Vec::new(),
            required: false,
            disabled_in_edit: false,
            accept: None,
            custom_render: None,
        }
    }

    pub fn options<O: Into<SelectOption>>(mut self, options: impl IntoIterator<Item = O>) -> Self {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn option_label<'a>(&'a self, value: &'a str) -> &'a str {
        self.options
            .iter()
            .find(|o| o.value == value)
            .map(|o| o.label.as_str())
            .unwrap_or(value)
    }

    /// Native control validation. Returns a message for the first problem.
    fn check(&self, value: Option<&FieldValue>) -> Option<String> {
        let text = value.and_then(FieldValue::as_text).unwrap_or("");
        match self.kind {
            FieldKind::Checkbox => {
                if self.required && !matches!(value, Some(FieldValue::Bool(true))) {
                    return Some(format!("{} must be checked", self.label));
                }
                None
            }
            FieldKind::CheckboxGroup => None,
            FieldKind::File => {
                if self.required && !matches!(value, Some(FieldValue::File(_))) {
                    return Some(format!("{} is required", self.label));
                }
                None
            }
            _ if text.is_empty() => self
                .required
                .then(|| format!("{} is required", self.label)),
            FieldKind::Email if !is_email(text) => {
                Some(format!("{} must be an email address", self.label))
            }
            FieldKind::Number if !text.parse::<f64>().is_ok_and(f64::is_finite) => {
                Some(format!("{} must be a number", self.label))
            }
            FieldKind::Date if NaiveDate::parse_from_str(text, "%Y-%m-%d").is_err() => {
                Some(format!("{} must be a date (YYYY-MM-DD)", self.label))
            }
            FieldKind::Time
                if NaiveTime::parse_from_str(text, "%H:%M").is_err()
                    && NaiveTime::parse_from_str(text, "%H:%M:%S").is_err() =>
            {
                Some(format!("{} must be a time (HH:MM)", self.label))
            }
            _ => None,
        }
    }
}

fn is_email(s: &str) -> bool {
    match s.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !s.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    Closed,
    Open(FormMode),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Saved,
    Blocked(Vec<String>),
    NotOpen,
}

/// Create/edit modal driven by a field schema.
pub struct FormEngine {
    title: String,
    fields: Vec<FieldSchema>,
    state: FormState,
    draft: Draft,
    previews: BTreeMap<String, String>,
    loader: PreviewLoader,
    focus: usize,
    option_focus: usize,
}

impl Default for FormEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FormEngine {
    pub fn new() -> Self {
        FormEngine {
            title: String::new(),
            fields: Vec::new(),
            state: FormState::Closed,
            draft: Draft::new(),
            previews: BTreeMap::new(),
            loader: PreviewLoader::new(),
            focus: 0,
            option_focus: 0,
        }
    }

    pub fn open_create(&mut self, title: &str, fields: Vec<FieldSchema>) {
        let draft = fields
            .iter()
            .map(|f| (f.name.clone(), FieldValue::default_for(f.kind)))
            .collect();
        self.open(title, fields, FormMode::Create, Draft(draft));
    }

    /// Opens in edit mode with the draft seeded verbatim from `initial`.
    pub fn open_edit(&mut self, title: &str, fields: Vec<FieldSchema>, initial: Draft) {
        self.open(title, fields, FormMode::Edit, initial);
    }

    fn open(&mut self, title: &str, fields: Vec<FieldSchema>, mode: FormMode, draft: Draft) {
        debug!("Opening form \"{title}\" in {mode} mode");
        self.reset();
        self.title = title.to_string();
        self.fields = fields;
        self.draft = draft;
        self.state = FormState::Open(mode);
    }

    pub fn close(&mut self) {
        trace!("Closing form \"{}\"", self.title);
        self.reset();
    }

    fn reset(&mut self) {
        self.state = FormState::Closed;
        self.draft = Draft::new();
        self.previews.clear();
        self.loader.cancel_all();
        self.focus = 0;
        self.option_focus = 0;
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, FormState::Open(_))
    }

    pub fn mode(&self) -> Option<FormMode> {
        match self.state {
            FormState::Open(mode) => Some(mode),
            FormState::Closed => None,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn preview(&self, name: &str) -> Option<&str> {
        self.previews.get(name).map(String::as_str)
    }

    pub fn preview_pending(&self, name: &str) -> bool {
        self.loader.is_pending(name)
    }

    pub fn is_disabled(&self, field: &FieldSchema) -> bool {
        field.disabled_in_edit && self.mode() == Some(FormMode::Edit)
    }

    fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The field with `name` if it exists, the form is open and it may be edited.
    fn editable(&self, name: &str) -> Option<FieldSchema> {
        if !self.is_open() {
            return None;
        }
        let field = self.field(name)?;
        if self.is_disabled(field) {
            trace!("Ignoring change to disabled field {name}");
            return None;
        }
        Some(field.clone())
    }

    pub fn set_text(&mut self, name: &str, value: &str) -> bool {
        match self.editable(name) {
            Some(field) if field.kind.is_text_input() || field.kind == FieldKind::Select => {
                self.draft.insert(name, value);
                true
            }
            _ => false,
        }
    }

    pub fn toggle(&mut self, name: &str) -> bool {
        match self.editable(name) {
            Some(field) if field.kind == FieldKind::Checkbox => {
                let on = self.draft.flag(name);
                self.draft.insert(name, !on);
                true
            }
            _ => false,
        }
    }

    /// Flips one option of a checkbox group, leaving the others untouched.
    pub fn toggle_option(&mut self, name: &str, option: &str) -> bool {
        match self.editable(name) {
            Some(field) if field.kind == FieldKind::CheckboxGroup => {
                let mut group = match self.draft.get(name) {
                    Some(FieldValue::Group(group)) => group.clone(),
                    _ => BTreeMap::new(),
                };
                let entry = group.entry(option.to_string()).or_insert(false);
                *entry = !*entry;
                self.draft.insert(name, FieldValue::Group(group));
                true
            }
            _ => false,
        }
    }

    pub fn cycle_select(&mut self, name: &str, forward: bool) -> bool {
        let Some(field) = self.editable(name) else {
            return false;
        };
        if field.kind != FieldKind::Select || field.options.is_empty() {
            return false;
        }
        let n = field.options.len();
        let current = field
            .options
            .iter()
            .position(|o| o.value == self.draft.text(name));
        let next = match (current, forward) {
            (None, true) => 0,
            (None, false) => n - 1,
            (Some(i), true) => (i + 1) % n,
            (Some(i), false) => (i + n - 1) % n,
        };
        self.draft.insert(name, field.options[next].value.as_str());
        true
    }

    /// Stores the file handle for `name` and starts an image preview read.
    pub fn select_file(&mut self, name: &str, path: &Path) -> Result<(), WardError> {
        let Some(field) = self.editable(name) else {
            return Err(WardError::NotPermitted("changing this field"));
        };
        if field.kind != FieldKind::File {
            return Err(WardError::InvalidSchema(format!("{name} is not a file field")));
        }
        let handle = FileHandle::open(path)?;
        if let Some(accept) = &field.accept
            && !handle.accepted_by(accept)
        {
            warn!("{} does not match {accept}", handle.name);
            return Err(WardError::FileRejected {
                path: path.to_path_buf(),
                reason: format!("expected {accept}"),
            });
        }
        self.previews.remove(name);
        self.loader.request(name, &handle);
        debug!("Selected {} ({:?}) for {name}", handle.name, handle.mime);
        self.draft.insert(name, FieldValue::File(handle));
        Ok(())
    }

    pub fn clear_file(&mut self, name: &str) -> bool {
        if self.editable(name).is_none() {
            return false;
        }
        self.loader.cancel(name);
        self.previews.remove(name);
        self.draft.insert(name, "");
        true
    }

    /// Applies finished preview reads. Returns how many arrived.
    pub fn poll_previews(&mut self) -> usize {
        let done = self.loader.poll();
        let count = done.len();
        for (field, url) in done {
            trace!("Preview ready for {field}");
            self.previews.insert(field, url);
        }
        count
    }

    /// Labels of every field that blocks submission. Locked fields are not
    /// checked since they cannot be corrected.
    pub fn validate(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| !self.is_disabled(f))
            .filter_map(|f| f.check(self.draft.get(&f.name)))
            .collect()
    }

    /// Hands the draft to `on_save` and closes, unless validation blocks it.
    pub fn submit(&mut self, on_save: impl FnOnce(Draft)) -> SubmitOutcome {
        if !self.is_open() {
            return SubmitOutcome::NotOpen;
        }
        let problems = self.validate();
        if !problems.is_empty() {
            debug!("Submit blocked: {problems:?}");
            return SubmitOutcome::Blocked(problems);
        }
        let draft = std::mem::take(&mut self.draft);
        on_save(draft);
        self.close();
        SubmitOutcome::Saved
    }

    // -------------------- Focus handling ---------------------- //

    /// Focused field index. `fields().len()` means the save button.
    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn option_focus(&self) -> usize {
        self.option_focus
    }

    pub fn focused_field(&self) -> Option<&FieldSchema> {
        self.fields.get(self.focus)
    }

    pub fn focus_next(&mut self) {
        self.focus = (self.focus + 1) % (self.fields.len() + 1);
        self.option_focus = 0;
    }

    pub fn focus_previous(&mut self) {
        let n = self.fields.len() + 1;
        self.focus = (self.focus + n - 1) % n;
        self.option_focus = 0;
    }

    pub fn focus_option(&mut self, forward: bool) {
        let n = self.focused_field().map(|f| f.options.len()).unwrap_or(0);
        if n == 0 {
            return;
        }
        self.option_focus = if forward {
            (self.option_focus + 1) % n
        } else {
            (self.option_focus + n - 1) % n
        };
    }

    /// Text shown for a field, honouring custom renderers.
    pub fn display_value(&self, field: &FieldSchema) -> String {
        let value = self.draft.get(&field.name);
        if let Some(render) = &field.custom_render {
            let fallback = FieldValue::default_for(field.kind);
            let mode = self.mode().unwrap_or(FormMode::Create);
            return render(value.unwrap_or(&fallback), mode);
        }
        match (field.kind, value) {
            (FieldKind::Checkbox, v) => {
                let on = matches!(v, Some(FieldValue::Bool(true)));
                if on { "[x]" } else { "[ ]" }.to_string()
            }
            (FieldKind::CheckboxGroup, v) => field
                .options
                .iter()
                .map(|o| {
                    let on = matches!(v, Some(FieldValue::Group(g)) if g.get(&o.value) == Some(&true));
                    format!("[{}] {}", if on { "x" } else { " " }, o.label)
                })
                .collect::<Vec<String>>()
                .join("  "),
            (FieldKind::Select, Some(FieldValue::Text(v))) => field.option_label(v).to_string(),
            (_, Some(FieldValue::File(handle))) => {
                format!("{} ({} bytes)", handle.name, handle.size)
            }
            (_, Some(FieldValue::Text(s))) => s.clone(),
            _ => String::new(),
        }
    }
}
