use crate::config::PayloadShape;
use crate::ranking::Ranking;
use std::borrow::Cow;

pub const EXPORT_CONTENT_TYPE: &str = "text/csv;charset=utf-8;";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Identity {
    /// Trims both fields and lowercases the email.
    pub fn normalized(name: &str, email: &str) -> Self {
        Self {
            name: name.trim().to_owned(),
            email: email.trim().to_lowercase(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    pub value: String,
}

impl FormField {
    fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub fields: Vec<FormField>,
    pub csv: String,
    pub file_name: String,
    /// Ranked advisors that did not fit into the posted fields.
    pub overflow: usize,
}

#[derive(Debug, Clone)]
pub struct PayloadBuilder {
    shape: PayloadShape,
    form_name: String,
}

impl PayloadBuilder {
    pub fn new(shape: PayloadShape, form_name: impl Into<String>) -> Self {
        Self {
            shape,
            form_name: form_name.into(),
        }
    }

    pub fn shape(&self) -> &PayloadShape {
        &self.shape
    }

    /// Same ranking and identity, same bytes.
    pub fn build(&self, ranking: &Ranking, identity: &Identity) -> Payload {
        let mut fields = vec![
            FormField::new("form-name", self.form_name.as_str()),
            FormField::new("Name", identity.name.as_str()),
            FormField::new("Email", identity.email.as_str()),
        ];
        fields.extend(self.choice_fields(ranking));

        Payload {
            fields,
            csv: student_csv(identity, ranking.ids()),
            file_name: export_file_name(&identity.email),
            overflow: self.overflow(ranking),
        }
    }

    /// The ranking-dependent fields only, as kept in the hidden inputs.
    pub fn choice_fields(&self, ranking: &Ranking) -> Vec<FormField> {
        let ids = ranking.ids();
        match &self.shape {
            PayloadShape::DiscreteFields { slots } => (0..*slots)
                .map(|index| {
                    FormField::new(
                        choice_label(index + 1),
                        ids.get(index).cloned().unwrap_or_default(),
                    )
                })
                .collect(),
            PayloadShape::SerializedBlob { field } => {
                vec![FormField::new(field.as_str(), rank_rows_csv(ids))]
            }
        }
    }

    pub fn overflow(&self, ranking: &Ranking) -> usize {
        match &self.shape {
            PayloadShape::DiscreteFields { slots } => ranking.len().saturating_sub(*slots),
            PayloadShape::SerializedBlob { .. } => 0,
        }
    }
}

pub fn ordinal(value: usize) -> String {
    let suffix = match (value % 100, value % 10) {
        (11..=13, _) => "th",
        (_, 1) => "st",
        (_, 2) => "nd",
        (_, 3) => "rd",
        _ => "th",
    };
    format!("{value}{suffix}")
}

pub fn choice_label(position: usize) -> String {
    format!("{} Choice", ordinal(position))
}

pub fn escape_csv(value: &str) -> Cow<'_, str> {
    if value.contains(|ch: char| matches!(ch, '"' | ',' | '\n')) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

fn csv_line<'a>(values: impl IntoIterator<Item = &'a str>) -> String {
    values
        .into_iter()
        .map(escape_csv)
        .collect::<Vec<_>>()
        .join(",")
}

/// Header row plus one value row: `Name,Email,1st Choice,...`.
pub fn student_csv(identity: &Identity, choices: &[String]) -> String {
    let labels: Vec<String> = (1..=choices.len()).map(choice_label).collect();

    let header = csv_line(
        ["Name", "Email"]
            .into_iter()
            .chain(labels.iter().map(String::as_str)),
    );
    let values = csv_line(
        [identity.name.as_str(), identity.email.as_str()]
            .into_iter()
            .chain(choices.iter().map(String::as_str)),
    );
    format!("{header}\n{values}")
}

/// One `rank,advisor` row per position.
pub fn rank_rows_csv(choices: &[String]) -> String {
    let mut lines = Vec::with_capacity(choices.len() + 1);
    lines.push(csv_line(["Rank", "Advisor"]));
    for (index, choice) in choices.iter().enumerate() {
        let rank = ordinal(index + 1);
        lines.push(csv_line([rank.as_str(), choice.as_str()]));
    }
    lines.join("\n")
}

pub fn export_file_name(email: &str) -> String {
    let safe: String = email
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '@' | '.' | '_' | '-') {
                ch
            } else {
                '-'
            }
        })
        .collect();

    if safe.is_empty() {
        "advisor-choices-student.csv".to_owned()
    } else {
        format!("advisor-choices-{safe}.csv")
    }
}
