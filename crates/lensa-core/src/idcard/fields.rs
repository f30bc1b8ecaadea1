//! Keyword and pattern heuristic turning OCR lines into ID card fields.
//!
//! Lines are read top to bottom and every rule is tried on every line. How
//! a rule's value lands in its field is decided by its [`FieldPolicy`].

use serde::{Deserialize, Serialize};

use crate::ocr::TextItem;

use super::patterns::{
    contains_any, ADDRESS_KEYWORDS, DATE_DMY, GENDER_KEYWORDS, ID_NUMBER, NAME_KEYWORDS,
    NAME_LABELS, NAME_MIN_CHARS,
};

/// Fields of an ID card record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    IdNumber,
    Name,
    PlaceOfBirth,
    DateOfBirth,
    Gender,
    Address,
    Religion,
    MaritalStatus,
    Occupation,
    Nationality,
    ValidUntil,
}

impl Field {
    pub const ALL: [Field; 11] = [
        Field::IdNumber,
        Field::Name,
        Field::PlaceOfBirth,
        Field::DateOfBirth,
        Field::Gender,
        Field::Address,
        Field::Religion,
        Field::MaritalStatus,
        Field::Occupation,
        Field::Nationality,
        Field::ValidUntil,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::IdNumber => "id_number",
            Field::Name => "name",
            Field::PlaceOfBirth => "place_of_birth",
            Field::DateOfBirth => "date_of_birth",
            Field::Gender => "gender",
            Field::Address => "address",
            Field::Religion => "religion",
            Field::MaritalStatus => "marital_status",
            Field::Occupation => "occupation",
            Field::Nationality => "nationality",
            Field::ValidUntil => "valid_until",
        }
    }

    /// How matches for this field are merged, or `None` for fields no rule fills.
    pub fn policy(&self) -> Option<FieldPolicy> {
        RULES.iter().find(|r| r.field == *self).map(|r| r.policy)
    }
}

/// How successive matching lines combine into one field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPolicy {
    /// Keep the first matching line.
    FirstMatch,
    /// Every matching line overwrites the previous one.
    LastMatch,
    /// Join all matching lines with a single space.
    Accumulate,
}

impl FieldPolicy {
    fn apply(self, slot: &mut String, value: String) {
        match self {
            FieldPolicy::FirstMatch => {
                if slot.is_empty() {
                    *slot = value;
                }
            }
            FieldPolicy::LastMatch => *slot = value,
            FieldPolicy::Accumulate => {
                if slot.is_empty() {
                    *slot = value;
                } else {
                    slot.push(' ');
                    slot.push_str(&value);
                }
            }
        }
    }
}

struct FieldRule {
    field: Field,
    policy: FieldPolicy,
    matches: fn(&str) -> bool,
    value: fn(&str) -> String,
}

/// Evaluated in this order for every line.
const RULES: [FieldRule; 5] = [
    FieldRule {
        field: Field::IdNumber,
        policy: FieldPolicy::FirstMatch,
        matches: is_id_number_line,
        value: whole_line,
    },
    FieldRule {
        field: Field::Name,
        policy: FieldPolicy::LastMatch,
        matches: is_name_line,
        value: strip_name_labels,
    },
    FieldRule {
        field: Field::DateOfBirth,
        policy: FieldPolicy::FirstMatch,
        matches: is_date_line,
        value: whole_line,
    },
    FieldRule {
        field: Field::Gender,
        policy: FieldPolicy::LastMatch,
        matches: is_gender_line,
        value: whole_line,
    },
    FieldRule {
        field: Field::Address,
        policy: FieldPolicy::Accumulate,
        matches: is_address_line,
        value: whole_line,
    },
];

fn is_id_number_line(line: &str) -> bool {
    ID_NUMBER.is_match(line)
}

fn is_name_line(line: &str) -> bool {
    contains_any(line, NAME_KEYWORDS) && line.chars().count() > NAME_MIN_CHARS
}

fn is_date_line(line: &str) -> bool {
    DATE_DMY.is_match(line)
}

fn is_gender_line(line: &str) -> bool {
    contains_any(line, GENDER_KEYWORDS)
}

fn is_address_line(line: &str) -> bool {
    contains_any(line, ADDRESS_KEYWORDS)
}

fn whole_line(line: &str) -> String {
    line.to_string()
}

fn strip_name_labels(line: &str) -> String {
    NAME_LABELS
        .iter()
        .fold(line.to_string(), |acc, label| acc.replace(label, ""))
        .trim()
        .to_string()
}

/// Structured ID card data. Empty strings mean "not found".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    pub id_number: String,
    pub name: String,
    pub place_of_birth: String,
    pub date_of_birth: String,
    pub gender: String,
    pub address: String,
    pub religion: String,
    pub marital_status: String,
    pub occupation: String,
    pub nationality: String,
    pub valid_until: String,

    /// Every recognized line, top to bottom.
    pub raw_text: Vec<String>,
}

impl ExtractedRecord {
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::IdNumber => &self.id_number,
            Field::Name => &self.name,
            Field::PlaceOfBirth => &self.place_of_birth,
            Field::DateOfBirth => &self.date_of_birth,
            Field::Gender => &self.gender,
            Field::Address => &self.address,
            Field::Religion => &self.religion,
            Field::MaritalStatus => &self.marital_status,
            Field::Occupation => &self.occupation,
            Field::Nationality => &self.nationality,
            Field::ValidUntil => &self.valid_until,
        }
    }

    fn slot(&mut self, field: Field) -> &mut String {
        match field {
            Field::IdNumber => &mut self.id_number,
            Field::Name => &mut self.name,
            Field::PlaceOfBirth => &mut self.place_of_birth,
            Field::DateOfBirth => &mut self.date_of_birth,
            Field::Gender => &mut self.gender,
            Field::Address => &mut self.address,
            Field::Religion => &mut self.religion,
            Field::MaritalStatus => &mut self.marital_status,
            Field::Occupation => &mut self.occupation,
            Field::Nationality => &mut self.nationality,
            Field::ValidUntil => &mut self.valid_until,
        }
    }

    /// Number of non-empty fields.
    pub fn filled_count(&self) -> usize {
        Field::ALL.iter().filter(|f| !self.get(**f).is_empty()).count()
    }
}

/// Run the field heuristic over OCR output.
///
/// Items are stably sorted by the y of their polygon center, so equal rows
/// keep the engine's order. Never fails: polygons are validated when the
/// items are built.
pub fn extract_fields(items: &[TextItem]) -> ExtractedRecord {
    let mut sorted: Vec<&TextItem> = items.iter().collect();
    sorted.sort_by(|a, b| a.center().y.total_cmp(&b.center().y));

    let mut record = ExtractedRecord::default();

    for item in sorted {
        let line = item.text.trim();
        record.raw_text.push(line.to_string());

        for rule in &RULES {
            if (rule.matches)(line) {
                rule.policy.apply(record.slot(rule.field), (rule.value)(line));
            }
        }
    }

    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Polygon;
    use pretty_assertions::assert_eq;

    /// One item per line, stacked 20px apart in the given order.
    fn lines(texts: &[&str]) -> Vec<TextItem> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let y = i as f32 * 20.0;
                TextItem::new(*t, 0.9, Polygon::from_rect(0.0, y, 100.0, y + 10.0))
            })
            .collect()
    }

    #[test]
    fn test_empty_input() {
        let record = extract_fields(&[]);
        assert_eq!(record, ExtractedRecord::default());
        assert!(record.raw_text.is_empty());
        assert_eq!(record.filled_count(), 0);
    }

    #[test]
    fn test_id_number_keeps_whole_line() {
        let record = extract_fields(&lines(&["ID 1234567890123456 rest"]));
        assert_eq!(record.id_number, "ID 1234567890123456 rest");
    }

    #[test]
    fn test_id_number_first_match_wins() {
        let record = extract_fields(&lines(&["1111111111111111", "2222222222222222"]));
        assert_eq!(record.id_number, "1111111111111111");
    }

    #[test]
    fn test_id_number_rejects_longer_runs() {
        let record = extract_fields(&lines(&["12345678901234567"]));
        assert_eq!(record.id_number, "");
    }

    #[test]
    fn test_name_last_match_wins() {
        let record = extract_fields(&lines(&["Nama: Budi Hartono X", "Name: Siti Aminah Y"]));
        assert_eq!(record.name, ": Siti Aminah Y");
    }

    #[test]
    fn test_name_requires_length() {
        let record = extract_fields(&lines(&["Nama: Budi"]));
        assert_eq!(record.name, "");
    }

    #[test]
    fn test_name_label_strip_is_case_sensitive() {
        let record = extract_fields(&lines(&["NAMA : BUDI HARTONO"]));
        assert_eq!(record.name, "NAMA : BUDI HARTONO");

        let record = extract_fields(&lines(&["Nama : BUDI HARTONO"]));
        assert_eq!(record.name, ": BUDI HARTONO");
    }

    #[test]
    fn test_address_tokens_match_inside_words() {
        let record = extract_fields(&lines(&["NAMA : BUDI HARTONO", "KARTU TANDA PENDUDUK"]));
        assert_eq!(record.address, "NAMA : BUDI HARTONO KARTU TANDA PENDUDUK");
    }

    #[test]
    fn test_address_accumulates_in_order() {
        let record = extract_fields(&lines(&["Jl. Merdeka No 5", "RT 01 RW 02"]));
        assert_eq!(record.address, "Jl. Merdeka No 5 RT 01 RW 02");
    }

    #[test]
    fn test_date_of_birth_first_match_wins() {
        let record = extract_fields(&lines(&["Lahir: 17-08-1990", "Berlaku: 01/01/2030"]));
        assert_eq!(record.date_of_birth, "Lahir: 17-08-1990");
    }

    #[test]
    fn test_gender_last_match_wins() {
        let record = extract_fields(&lines(&["Jenis Kelamin: LAKI-LAKI", "PEREMPUAN"]));
        assert_eq!(record.gender, "PEREMPUAN");
    }

    #[test]
    fn test_one_line_can_fill_several_fields() {
        let record = extract_fields(&lines(&["Tempat/Tgl Lahir: JAKARTA, 17-08-1990 RT"]));
        assert_eq!(record.date_of_birth, "Tempat/Tgl Lahir: JAKARTA, 17-08-1990 RT");
        assert_eq!(record.address, "Tempat/Tgl Lahir: JAKARTA, 17-08-1990 RT");
    }

    #[test]
    fn test_raw_text_sorted_by_center_y() {
        let items = vec![
            TextItem::new("bottom", 0.9, Polygon::from_rect(0.0, 80.0, 50.0, 90.0)),
            TextItem::new("  top  ", 0.9, Polygon::from_rect(0.0, 0.0, 50.0, 10.0)),
            TextItem::new("middle", 0.9, Polygon::from_rect(0.0, 40.0, 50.0, 50.0)),
        ];
        let record = extract_fields(&items);
        assert_eq!(record.raw_text, vec!["top", "middle", "bottom"]);
    }

    #[test]
    fn test_sort_is_stable_for_equal_rows() {
        let items = vec![
            TextItem::new("first", 0.9, Polygon::from_rect(50.0, 0.0, 90.0, 10.0)),
            TextItem::new("second", 0.9, Polygon::from_rect(0.0, 0.0, 40.0, 10.0)),
        ];
        assert_eq!(extract_fields(&items).raw_text, vec!["first", "second"]);
    }

    #[test]
    fn test_raw_text_length_matches_input() {
        let items = lines(&["a", "", "c", "1234567890123456"]);
        assert_eq!(extract_fields(&items).raw_text.len(), items.len());
    }

    #[test]
    fn test_placeholder_fields_stay_empty() {
        let record = extract_fields(&lines(&[
            "Agama: ISLAM",
            "Status Perkawinan: KAWIN",
            "Pekerjaan: KARYAWAN SWASTA",
            "Kewarganegaraan: WNI",
            "Berlaku Hingga: SEUMUR HIDUP",
        ]));
        for field in [
            Field::PlaceOfBirth,
            Field::Religion,
            Field::MaritalStatus,
            Field::Occupation,
            Field::Nationality,
            Field::ValidUntil,
        ] {
            assert_eq!(record.get(field), "", "{} should be empty", field.as_str());
            assert_eq!(field.policy(), None);
        }
    }

    #[test]
    fn test_field_policies() {
        assert_eq!(Field::IdNumber.policy(), Some(FieldPolicy::FirstMatch));
        assert_eq!(Field::Name.policy(), Some(FieldPolicy::LastMatch));
        assert_eq!(Field::DateOfBirth.policy(), Some(FieldPolicy::FirstMatch));
        assert_eq!(Field::Gender.policy(), Some(FieldPolicy::LastMatch));
        assert_eq!(Field::Address.policy(), Some(FieldPolicy::Accumulate));
    }

    #[test]
    fn test_record_serializes_all_fields() {
        let value = serde_json::to_value(ExtractedRecord::default()).unwrap();
        for field in Field::ALL {
            assert_eq!(value[field.as_str()], "");
        }
        assert_eq!(value["raw_text"], serde_json::json!([]));
    }
}
