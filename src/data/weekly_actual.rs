use crate::data::persistence::Persistable;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// One persisted record per (style_number, week_number, year).
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyActual {
    pub style_number: String,
    #[serde(default)]
    pub style_name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, deserialize_with = "flex_string")]
    pub season: String,
    #[serde(default)]
    pub division_name: String,
    #[serde(default, deserialize_with = "flex_qty")]
    pub total_plan_qty: i64,
    pub week_number: u32,
    #[serde(default)]
    pub year: i32,
    #[serde(default, deserialize_with = "flex_qty")]
    pub sales_qty: i64,
    #[serde(default, deserialize_with = "flex_qty")]
    pub store_inv_qty: i64,
    /// Baseline only; the grid shows the cumulative balance instead.
    #[serde(default, deserialize_with = "flex_qty")]
    pub wh_inv_qty: i64,
    #[serde(default, deserialize_with = "flex_qty")]
    pub intake_qty: i64,
    /// Planner override written through the `otb` field of the bulk update.
    #[serde(default, deserialize_with = "flex_opt_qty", skip_serializing_if = "Option::is_none")]
    pub otb: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_store_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_date: Option<NaiveDate>,
}

impl WeeklyActual {
    /// A zeroed row for `week` carrying the descriptive attributes of `template`.
    pub fn blank_like(template: &WeeklyActual, week_number: u32) -> Self {
        WeeklyActual {
            style_number: template.style_number.clone(),
            style_name: template.style_name.clone(),
            category: template.category.clone(),
            season: template.season.clone(),
            division_name: template.division_name.clone(),
            total_plan_qty: template.total_plan_qty,
            week_number,
            year: template.year,
            ..Default::default()
        }
    }

    pub fn field(&self, field: EditField) -> Option<i64> {
        match field {
            EditField::SalesQty => Some(self.sales_qty),
            EditField::StoreInvQty => Some(self.store_inv_qty),
            EditField::IntakeQty => Some(self.intake_qty),
            EditField::Otb => self.otb,
        }
    }

    pub fn set_field(&mut self, field: EditField, value: Option<i64>) {
        match field {
            EditField::SalesQty => self.sales_qty = value.unwrap_or(0),
            EditField::StoreInvQty => self.store_inv_qty = value.unwrap_or(0),
            EditField::IntakeQty => self.intake_qty = value.unwrap_or(0),
            EditField::Otb => self.otb = value,
        }
    }
}

/// The raw fields a grid edit may write, keyed by their wire names.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EditField {
    SalesQty,
    StoreInvQty,
    IntakeQty,
    Otb,
}

impl EditField {
    pub fn wire_name(self) -> &'static str {
        match self {
            EditField::SalesQty => "sales_qty",
            EditField::StoreInvQty => "store_inv_qty",
            EditField::IntakeQty => "intake_qty",
            EditField::Otb => "otb",
        }
    }
}

impl fmt::Display for EditField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Local row store file used when no API endpoint is configured.
#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct WeeklyActualData {
    pub rows: Vec<WeeklyActual>,
}

impl Persistable for WeeklyActualData {
    fn filename() -> &'static str {
        "otb_rows.json"
    }
    fn is_json() -> bool {
        true
    }
}

impl WeeklyActualData {
    pub fn find_mut(&mut self, style_number: &str, week_number: u32) -> Option<&mut WeeklyActual> {
        self.rows
            .iter_mut()
            .rev()
            .find(|r| r.style_number == style_number && r.week_number == week_number)
    }

    pub fn template_for(&self, style_number: &str) -> Option<&WeeklyActual> {
        self.rows.iter().find(|r| r.style_number == style_number)
    }

    pub fn first_week_of(&self, style_number: &str) -> Option<u32> {
        self.rows
            .iter()
            .filter(|r| r.style_number == style_number)
            .map(|r| r.week_number)
            .min()
    }
}

// ── Lenient field decoding ────────────────────────────────────────────────────
//
// SQL-backed endpoints frequently return numeric columns as strings or floats,
// and unset quantities as null.

#[derive(Deserialize)]
#[serde(untagged)]
enum QtyRepr {
    Int(i64),
    Float(f64),
    Text(String),
}

impl QtyRepr {
    fn into_qty<E: serde::de::Error>(self) -> Result<Option<i64>, E> {
        match self {
            QtyRepr::Int(n) => Ok(Some(n)),
            QtyRepr::Float(x) => Ok(Some(x.round() as i64)),
            QtyRepr::Text(s) => {
                let t = s.trim();
                if t.is_empty() {
                    return Ok(None);
                }
                t.parse::<i64>()
                    .or_else(|_| t.parse::<f64>().map(|x| x.round() as i64))
                    .map(Some)
                    .map_err(|_| E::custom(format!("invalid quantity '{s}'")))
            }
        }
    }
}

fn flex_opt_qty<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<QtyRepr>::deserialize(deserializer)? {
        Some(repr) => repr.into_qty(),
        None => Ok(None),
    }
}

fn flex_qty<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(flex_opt_qty(deserializer)?.unwrap_or(0))
}

fn flex_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StrRepr {
        Int(i64),
        Text(String),
    }
    Ok(match Option::<StrRepr>::deserialize(deserializer)? {
        Some(StrRepr::Int(n)) => n.to_string(),
        Some(StrRepr::Text(s)) => s,
        None => String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_camel_case_row() {
        let json = r#"{
            "styleNumber": "ST-001", "styleName": "Linen Shirt", "category": "Tops",
            "season": 1, "divisionName": "Mens", "totalPlanQty": 500,
            "weekNumber": 3, "year": 2025, "salesQty": 10, "storeInvQty": 20,
            "whInvQty": 100, "intakeQty": 0, "launchDate": "2025-01-06"
        }"#;
        let row: WeeklyActual = serde_json::from_str(json).unwrap();
        assert_eq!(row.style_number, "ST-001");
        assert_eq!(row.season, "1");
        assert_eq!(row.total_plan_qty, 500);
        assert_eq!(row.week_number, 3);
        assert_eq!(row.wh_inv_qty, 100);
        assert_eq!(row.launch_date, NaiveDate::from_ymd_opt(2025, 1, 6));
        assert_eq!(row.otb, None);
    }

    #[test]
    fn test_null_and_missing_quantities_are_zero() {
        let json = r#"{"styleNumber": "ST-001", "weekNumber": 2, "whInvQty": null}"#;
        let row: WeeklyActual = serde_json::from_str(json).unwrap();
        assert_eq!(row.wh_inv_qty, 0);
        assert_eq!(row.sales_qty, 0);
        assert_eq!(row.season, "");
    }

    #[test]
    fn test_numeric_strings_and_floats_accepted() {
        let json = r#"{"styleNumber": "A", "weekNumber": 1, "totalPlanQty": "1000",
                       "salesQty": 12.0, "storeInvQty": " 7 ", "otb": "-40"}"#;
        let row: WeeklyActual = serde_json::from_str(json).unwrap();
        assert_eq!(row.total_plan_qty, 1000);
        assert_eq!(row.sales_qty, 12);
        assert_eq!(row.store_inv_qty, 7);
        assert_eq!(row.otb, Some(-40));
    }

    #[test]
    fn test_garbage_quantity_is_an_error() {
        let json = r#"{"styleNumber": "A", "weekNumber": 1, "salesQty": "lots"}"#;
        assert!(serde_json::from_str::<WeeklyActual>(json).is_err());
    }

    #[test]
    fn test_serialize_uses_camel_case() {
        let row = WeeklyActual {
            style_number: "ST-9".to_string(),
            week_number: 4,
            ..Default::default()
        };
        let json = serde_json::to_string(&row).unwrap();
        assert!(json.contains("\"styleNumber\":\"ST-9\""));
        assert!(json.contains("\"storeInvQty\":0"));
        assert!(!json.contains("launchDate"));
    }

    #[test]
    fn test_edit_field_wire_names() {
        assert_eq!(EditField::SalesQty.wire_name(), "sales_qty");
        assert_eq!(EditField::StoreInvQty.wire_name(), "store_inv_qty");
        assert_eq!(EditField::IntakeQty.wire_name(), "intake_qty");
        assert_eq!(EditField::Otb.wire_name(), "otb");
        assert_eq!(serde_json::to_string(&EditField::IntakeQty).unwrap(), "\"intake_qty\"");
    }

    #[test]
    fn test_set_field_and_field() {
        let mut row = WeeklyActual::default();
        row.set_field(EditField::IntakeQty, Some(42));
        assert_eq!(row.field(EditField::IntakeQty), Some(42));
        row.set_field(EditField::Otb, Some(-5));
        assert_eq!(row.field(EditField::Otb), Some(-5));
        row.set_field(EditField::Otb, None);
        assert_eq!(row.field(EditField::Otb), None);
        row.set_field(EditField::SalesQty, None);
        assert_eq!(row.field(EditField::SalesQty), Some(0));
    }

    #[test]
    fn test_blank_like_copies_attributes_only() {
        let template = WeeklyActual {
            style_number: "ST-1".to_string(),
            style_name: "Tee".to_string(),
            total_plan_qty: 300,
            week_number: 1,
            sales_qty: 9,
            ..Default::default()
        };
        let blank = WeeklyActual::blank_like(&template, 7);
        assert_eq!(blank.style_name, "Tee");
        assert_eq!(blank.total_plan_qty, 300);
        assert_eq!(blank.week_number, 7);
        assert_eq!(blank.sales_qty, 0);
    }

    #[test]
    fn test_find_mut_prefers_last_duplicate() {
        let mut data = WeeklyActualData::default();
        let mut a = WeeklyActual { style_number: "S".into(), week_number: 1, ..Default::default() };
        data.rows.push(a.clone());
        a.sales_qty = 5;
        data.rows.push(a);
        assert_eq!(data.find_mut("S", 1).unwrap().sales_qty, 5);
        assert!(data.find_mut("S", 2).is_none());
    }
}
