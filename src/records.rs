use std::sync::Arc;

use crate::domain::{RowId, WardError};
use crate::form::{Draft, FieldKind, FieldSchema, FieldValue, FileHandle, FormMode};
use crate::page::Access;
use crate::table::{CellValue, Column, Row};

/// A row type with the schemas a page needs to show and edit it.
pub trait Record: Row + Clone + Send + Sync + 'static {
    /// Page title, also the stem of the csv file the page is seeded from.
    const NAME: &'static str;

    fn columns() -> Vec<Column<Self>>;

    fn fields() -> Vec<FieldSchema>;

    /// Everything but the id, keyed by field name.
    fn to_draft(&self) -> Draft;

    /// Builds the record from a saved draft. Page level validation lives here.
    fn from_draft(id: RowId, draft: &Draft) -> Result<Self, WardError>;

    fn actions(&self, access: Access) -> Vec<&'static str> {
        access_actions(access)
    }
}

fn access_actions(access: Access) -> Vec<&'static str> {
    let mut actions = Vec::new();
    if access.edit {
        actions.push("edit");
    }
    if access.delete {
        actions.push("delete");
    }
    if actions.is_empty() {
        actions.push("view");
    }
    actions
}

fn file_value(file: &Option<FileHandle>) -> FieldValue {
    match file {
        Some(handle) => FieldValue::File(handle.clone()),
        None => FieldValue::Text(String::new()),
    }
}

fn group_value(options: &[&str], checked: &[String]) -> FieldValue {
    FieldValue::Group(
        options
            .iter()
            .map(|o| (o.to_string(), checked.iter().any(|c| c == o)))
            .collect(),
    )
}

fn yes_no(value: &CellValue) -> String {
    match value {
        CellValue::Bool(true) => "yes".to_string(),
        CellValue::Bool(false) => "no".to_string(),
        other => other.to_string(),
    }
}

const ALLERGIES: [&str; 4] = ["penicillin", "latex", "peanuts", "iodine"];
const DOSAGE_TIMES: [&str; 4] = ["morning", "noon", "evening", "night"];
const WARDS: [&str; 4] = ["General", "Cardiology", "Paediatrics", "Maternity"];
const DOCTORS: [&str; 4] = ["Dr. Mensah", "Dr. Okafor", "Dr. Lindqvist", "Dr. Haddad"];

#[derive(Debug, Clone, PartialEq)]
pub struct Patient {
    pub id: RowId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub date_of_birth: String,
    pub gender: String,
    pub blood_group: String,
    pub ward: String,
    pub admitted: bool,
    pub allergies: Vec<String>,
    pub notes: String,
    pub photo: Option<FileHandle>,
}

impl Row for Patient {
    fn id(&self) -> RowId {
        self.id
    }
}

impl Record for Patient {
    const NAME: &'static str = "patients";

    fn columns() -> Vec<Column<Self>> {
        vec![
            Column::new("ID", |p: &Patient| (p.id as i64).into()),
            Column::new("Name", |p: &Patient| p.name.as_str().into()),
            Column::new("Born", |p: &Patient| p.date_of_birth.as_str().into()),
            Column::new("Gender", |p: &Patient| p.gender.as_str().into()),
            Column::new("Blood", |p: &Patient| p.blood_group.as_str().into()),
            Column::new("Ward", |p: &Patient| p.ward.as_str().into()),
            Column::new("Admitted", |p: &Patient| p.admitted.into()).with_render(|v, _| yes_no(v)),
            Column::new("Allergies", |p: &Patient| p.allergies.clone().into()).with_render(
                |v, _| match v {
                    CellValue::List(items) if items.is_empty() => "none".to_string(),
                    other => other.to_string(),
                },
            ),
        ]
    }

    fn fields() -> Vec<FieldSchema> {
        vec![
            FieldSchema::new("name", "Full name", FieldKind::Text).required(),
            FieldSchema::new("email", "Email", FieldKind::Email),
            FieldSchema::new("phone", "Phone", FieldKind::Text),
            FieldSchema::new("date_of_birth", "Date of birth", FieldKind::Date)
                .required()
                .disabled_in_edit(),
            FieldSchema::new("gender", "Gender", FieldKind::Select)
                .options(["Female", "Male", "Other"])
                .required(),
            FieldSchema::new("blood_group", "Blood group", FieldKind::Select).options([
                ("A+", "A positive"),
                ("A-", "A negative"),
                ("B+", "B positive"),
                ("B-", "B negative"),
                ("AB+", "AB positive"),
                ("AB-", "AB negative"),
                ("O+", "O positive"),
                ("O-", "O negative"),
            ]),
            FieldSchema::new("ward", "Ward", FieldKind::Select).options(WARDS),
            FieldSchema::new("admitted", "Admitted", FieldKind::Checkbox),
            FieldSchema::new("allergies", "Allergies", FieldKind::CheckboxGroup)
                .options(ALLERGIES),
            FieldSchema::new("notes", "Notes", FieldKind::Textarea),
            FieldSchema::new("photo", "Photo", FieldKind::File).accept("image/*"),
        ]
    }

    fn to_draft(&self) -> Draft {
        Draft::new()
            .with("name", self.name.as_str())
            .with("email", self.email.as_str())
            .with("phone", self.phone.as_str())
            .with("date_of_birth", self.date_of_birth.as_str())
            .with("gender", self.gender.as_str())
            .with("blood_group", self.blood_group.as_str())
            .with("ward", self.ward.as_str())
            .with("admitted", self.admitted)
            .with("allergies", group_value(&ALLERGIES, &self.allergies))
            .with("notes", self.notes.as_str())
            .with("photo", file_value(&self.photo))
    }

    fn from_draft(id: RowId, draft: &Draft) -> Result<Self, WardError> {
        Ok(Patient {
            id,
            name: draft.text("name").to_string(),
            email: draft.text("email").to_string(),
            phone: draft.text("phone").to_string(),
            date_of_birth: draft.text("date_of_birth").to_string(),
            gender: draft.text("gender").to_string(),
            blood_group: draft.text("blood_group").to_string(),
            ward: draft.text("ward").to_string(),
            admitted: draft.flag("admitted"),
            allergies: draft.checked("allergies"),
            notes: draft.text("notes").to_string(),
            photo: draft.file("photo").cloned(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Appointment {
    pub id: RowId,
    pub patient: String,
    pub doctor: String,
    pub date: String,
    pub time: String,
    pub kind: String,
    pub status: String,
    pub notes: String,
}

impl Row for Appointment {
    fn id(&self) -> RowId {
        self.id
    }
}

fn status_badge(value: &FieldValue, mode: FormMode) -> String {
    let status = value.as_text().filter(|s| !s.is_empty());
    match (status, mode) {
        (Some("completed"), _) => "✔ completed".to_string(),
        (Some("cancelled"), _) => "✘ cancelled".to_string(),
        (Some(other), _) => format!("● {other}"),
        (None, FormMode::Create) => "● scheduled when saved".to_string(),
        (None, FormMode::Edit) => String::new(),
    }
}

impl Record for Appointment {
    const NAME: &'static str = "appointments";

    fn columns() -> Vec<Column<Self>> {
        vec![
            Column::new("Patient", |a: &Appointment| a.patient.as_str().into()),
            Column::new("Doctor", |a: &Appointment| a.doctor.as_str().into()),
            Column::new("When", |a: &Appointment| a.date.as_str().into())
                .with_render(|v, a: &Appointment| format!("{v} {}", a.time)),
            Column::new("Type", |a: &Appointment| a.kind.as_str().into()),
            Column::new("Status", |a: &Appointment| a.status.as_str().into()),
        ]
    }

    fn fields() -> Vec<FieldSchema> {
        vec![
            FieldSchema::new("patient", "Patient", FieldKind::Text)
                .required()
                .disabled_in_edit(),
            FieldSchema::new("doctor", "Doctor", FieldKind::Select)
                .options(DOCTORS)
                .required(),
            FieldSchema::new("date", "Date", FieldKind::Date).required(),
            FieldSchema::new("time", "Time", FieldKind::Time).required(),
            FieldSchema::new("kind", "Type", FieldKind::Select).options([
                ("consultation", "Consultation"),
                ("follow-up", "Follow-up"),
                ("therapy", "Therapy session"),
                ("vaccination", "Vaccination"),
            ]),
            FieldSchema::new("status", "Status", FieldKind::Select)
                .options(["scheduled", "completed", "cancelled"])
                .custom_render(Arc::new(status_badge)),
            FieldSchema::new("notes", "Notes", FieldKind::Textarea),
        ]
    }

    fn to_draft(&self) -> Draft {
        Draft::new()
            .with("patient", self.patient.as_str())
            .with("doctor", self.doctor.as_str())
            .with("date", self.date.as_str())
            .with("time", self.time.as_str())
            .with("kind", self.kind.as_str())
            .with("status", self.status.as_str())
            .with("notes", self.notes.as_str())
    }

    fn from_draft(id: RowId, draft: &Draft) -> Result<Self, WardError> {
        let status = match draft.text("status") {
            "" => "scheduled",
            s => s,
        };
        Ok(Appointment {
            id,
            patient: draft.text("patient").to_string(),
            doctor: draft.text("doctor").to_string(),
            date: draft.text("date").to_string(),
            time: draft.text("time").to_string(),
            kind: draft.text("kind").to_string(),
            status: status.to_string(),
            notes: draft.text("notes").to_string(),
        })
    }

    /// Completed appointments are history and can only be removed.
    fn actions(&self, access: Access) -> Vec<&'static str> {
        if self.status == "completed" {
            if access.delete { vec!["delete"] } else { vec!["view"] }
        } else {
            access_actions(access)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Medication {
    pub id: RowId,
    pub name: String,
    pub dosage: String,
    pub form: String,
    pub stock: i64,
    pub dosage_times: Vec<String>,
    pub prescription_only: bool,
    pub instructions: String,
}

impl Row for Medication {
    fn id(&self) -> RowId {
        self.id
    }
}

impl Record for Medication {
    const NAME: &'static str = "medications";

    fn columns() -> Vec<Column<Self>> {
        vec![
            Column::new("Name", |m: &Medication| m.name.as_str().into()),
            Column::new("Dosage", |m: &Medication| m.dosage.as_str().into()),
            Column::new("Form", |m: &Medication| m.form.as_str().into()),
            Column::new("Stock", |m: &Medication| m.stock.into()).with_render(|v, m| {
                if m.stock < 20 {
                    format!("{v} (low)")
                } else {
                    v.to_string()
                }
            }),
            Column::new("Times", |m: &Medication| m.dosage_times.clone().into()),
            Column::new("Rx", |m: &Medication| m.prescription_only.into())
                .with_render(|v, _| yes_no(v)),
        ]
    }

    fn fields() -> Vec<FieldSchema> {
        vec![
            FieldSchema::new("name", "Name", FieldKind::Text).required(),
            FieldSchema::new("dosage", "Dosage", FieldKind::Text).required(),
            FieldSchema::new("form", "Form", FieldKind::Select)
                .options(["tablet", "capsule", "syrup", "injection"]),
            FieldSchema::new("stock", "Stock", FieldKind::Number).required(),
            FieldSchema::new("dosage_times", "Dosage times", FieldKind::CheckboxGroup)
                .options(DOSAGE_TIMES),
            FieldSchema::new("prescription_only", "Prescription only", FieldKind::Checkbox),
            FieldSchema::new("instructions", "Instructions", FieldKind::Textarea),
        ]
    }

    fn to_draft(&self) -> Draft {
        Draft::new()
            .with("name", self.name.as_str())
            .with("dosage", self.dosage.as_str())
            .with("form", self.form.as_str())
            .with("stock", self.stock.to_string())
            .with("dosage_times", group_value(&DOSAGE_TIMES, &self.dosage_times))
            .with("prescription_only", self.prescription_only)
            .with("instructions", self.instructions.as_str())
    }

    fn from_draft(id: RowId, draft: &Draft) -> Result<Self, WardError> {
        let checked = draft.checked("dosage_times");
        let dosage_times: Vec<String> = DOSAGE_TIMES
            .iter()
            .filter(|t| checked.iter().any(|c| c == *t))
            .map(|t| t.to_string())
            .collect();
        if dosage_times.is_empty() {
            return Err(WardError::InvalidRecord(
                "select at least one dosage time".into(),
            ));
        }
        let stock = parse_stock(draft.text("stock"))?;
        Ok(Medication {
            id,
            name: draft.text("name").to_string(),
            dosage: draft.text("dosage").to_string(),
            form: draft.text("form").to_string(),
            stock,
            dosage_times,
            prescription_only: draft.flag("prescription_only"),
            instructions: draft.text("instructions").to_string(),
        })
    }
}

fn parse_stock(text: &str) -> Result<i64, WardError> {
    let text = text.trim();
    let stock = text
        .parse::<f64>()
        .ok()
        .filter(|s| s.is_finite())
        .map(f64::round)
        .ok_or_else(|| WardError::InvalidRecord(format!("stock \"{text}\" is not a number")))?;
    if !(0.0..i64::MAX as f64).contains(&stock) {
        return Err(WardError::InvalidRecord(format!(
            "stock {text} is out of range"
        )));
    }
    Ok(stock as i64)
}

#[derive(Debug, Clone, PartialEq)]
pub struct StaffMember {
    pub id: RowId,
    pub name: String,
    pub role: String,
    pub email: String,
    pub department: String,
    pub shift_start: String,
    pub on_duty: bool,
    pub license: Option<FileHandle>,
}

impl Row for StaffMember {
    fn id(&self) -> RowId {
        self.id
    }
}

impl Record for StaffMember {
    const NAME: &'static str = "staff";

    fn columns() -> Vec<Column<Self>> {
        vec![
            Column::new("Name", |s: &StaffMember| s.name.as_str().into()),
            Column::new("Role", |s: &StaffMember| s.role.as_str().into()),
            Column::new("Email", |s: &StaffMember| s.email.as_str().into()),
            Column::new("Department", |s: &StaffMember| s.department.as_str().into()),
            Column::new("Shift", |s: &StaffMember| s.shift_start.as_str().into()),
            Column::new("On duty", |s: &StaffMember| s.on_duty.into())
                .with_render(|v, _| yes_no(v)),
            Column::new("License", |s: &StaffMember| {
                s.license.as_ref().map(|l| l.name.clone()).into()
            }),
        ]
    }

    fn fields() -> Vec<FieldSchema> {
        vec![
            FieldSchema::new("name", "Full name", FieldKind::Text).required(),
            FieldSchema::new("role", "Role", FieldKind::Select)
                .options([
                    ("doctor", "Doctor"),
                    ("nurse", "Nurse"),
                    ("pharmacist", "Pharmacist"),
                    ("receptionist", "Receptionist"),
                    ("therapist", "Therapist"),
                ])
                .required(),
            FieldSchema::new("email", "Email", FieldKind::Email)
                .required()
                .disabled_in_edit(),
            FieldSchema::new("department", "Department", FieldKind::Select).options(WARDS),
            FieldSchema::new("shift_start", "Shift start", FieldKind::Time),
            FieldSchema::new("on_duty", "On duty", FieldKind::Checkbox),
            FieldSchema::new("license", "License scan", FieldKind::File).accept("image/*,.pdf"),
        ]
    }

    fn to_draft(&self) -> Draft {
        Draft::new()
            .with("name", self.name.as_str())
            .with("role", self.role.as_str())
            .with("email", self.email.as_str())
            .with("department", self.department.as_str())
            .with("shift_start", self.shift_start.as_str())
            .with("on_duty", self.on_duty)
            .with("license", file_value(&self.license))
    }

    fn from_draft(id: RowId, draft: &Draft) -> Result<Self, WardError> {
        Ok(StaffMember {
            id,
            name: draft.text("name").to_string(),
            role: draft.text("role").to_string(),
            email: draft.text("email").to_string(),
            department: draft.text("department").to_string(),
            shift_start: draft.text("shift_start").to_string(),
            on_duty: draft.flag("on_duty"),
            license: draft.file("license").cloned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::FormEngine;

    fn medication_draft(times: &[&str]) -> Draft {
        let fields = Medication::fields();
        let times = times.join("|");
        let raw = [
            ("name", "Amoxicillin"),
            ("dosage", "500mg"),
            ("form", "capsule"),
            ("stock", "42"),
            ("dosage_times", times.as_str()),
            ("prescription_only", "true"),
        ];
        Draft::from_strings(&fields, |name| {
            raw.iter().find(|(k, _)| *k == name).map(|(_, v)| *v)
        })
    }

    #[test]
    fn medication_needs_a_dosage_time() {
        assert!(matches!(
            Medication::from_draft(1, &medication_draft(&[])),
            Err(WardError::InvalidRecord(_))
        ));
        let med = Medication::from_draft(1, &medication_draft(&["night", "morning"])).unwrap();
        assert_eq!(med.dosage_times, vec!["morning", "night"]);
        assert_eq!(med.stock, 42);
        assert!(med.prescription_only);
    }

    #[test]
    fn stock_must_be_a_count() {
        let with_stock = |stock: &str| {
            let mut draft = medication_draft(&["morning"]);
            draft.insert("stock", stock);
            Medication::from_draft(1, &draft)
        };
        for bad in ["inf", "NaN", "", "1e400", "-3"] {
            assert!(
                matches!(with_stock(bad), Err(WardError::InvalidRecord(_))),
                "{bad}"
            );
        }
        assert_eq!(with_stock(" 12.6 ").unwrap().stock, 13);
        assert_eq!(with_stock("0").unwrap().stock, 0);
    }

    #[test]
    fn patient_draft_round_trips_through_edit_form() {
        let patient = Patient {
            id: 7,
            name: "Amara Osei".into(),
            email: "amara@example.org".into(),
            phone: "555-0101".into(),
            date_of_birth: "1984-03-12".into(),
            gender: "Female".into(),
            blood_group: "O+".into(),
            ward: "Cardiology".into(),
            admitted: true,
            allergies: vec!["latex".into()],
            notes: String::new(),
            photo: None,
        };
        let mut form = FormEngine::new();
        form.open_edit("Edit patient", Patient::fields(), patient.to_draft());
        assert_eq!(form.draft(), &patient.to_draft());
        for field in Patient::fields() {
            assert!(form.draft().get(&field.name).is_some(), "{}", field.name);
        }

        let mut saved = None;
        form.submit(|d| saved = Some(d));
        let saved = Patient::from_draft(7, &saved.unwrap()).unwrap();
        assert_eq!(saved, patient);
    }

    #[test]
    fn columns_render_flags() {
        let staff = StaffMember {
            id: 1,
            name: "Noor Haddad".into(),
            role: "nurse".into(),
            email: "noor@clinic.org".into(),
            department: "General".into(),
            shift_start: "07:00".into(),
            on_duty: true,
            license: None,
        };
        let cells: Vec<String> = StaffMember::columns().iter().map(|c| c.cell(&staff)).collect();
        assert_eq!(cells[5], "yes");
        assert_eq!(cells[6], "");
    }

    #[test]
    fn completed_appointments_cannot_be_edited() {
        let mut appointment = Appointment::from_draft(
            1,
            &Draft::new().with("patient", "Amara Osei").with("status", "completed"),
        )
        .unwrap();
        assert_eq!(appointment.actions(Access::FULL), vec!["delete"]);
        appointment.status = "scheduled".into();
        assert_eq!(appointment.actions(Access::FULL), vec!["edit", "delete"]);
        assert_eq!(appointment.actions(Access::READ_ONLY), vec!["view"]);
    }

    #[test]
    fn status_field_shows_a_badge() {
        let mut form = FormEngine::new();
        form.open_create("New appointment", Appointment::fields());
        let status = form
            .fields()
            .iter()
            .find(|f| f.name == "status")
            .cloned()
            .unwrap();
        assert_eq!(form.display_value(&status), "● scheduled when saved");

        form.cycle_select("status", true);
        assert_eq!(form.display_value(&status), "● scheduled");
        form.cycle_select("status", true);
        assert_eq!(form.display_value(&status), "✔ completed");
    }
}
