//! Raw HTML form payloads and their validation into typed inputs.
//!
//! Every field arrives as a string so that a bad number re-renders the form
//! with an inline message instead of failing extraction with a bare 400.

use serde::{Deserialize, Serialize};

use crate::{
    search::{SearchCriteria, SearchField},
    structs::{FieldErrors, InventoryItem, ItemInput},
    utils::optional_text,
};

const REQUIRED: &str = "This field is required.";

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.username.trim().is_empty() {
            errors.insert("username", REQUIRED.into());
        }
        if self.password.is_empty() {
            errors.insert("password", REQUIRED.into());
        }
        finish(errors, ())
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(skip_serializing)]
    pub password2: String,
}

impl RegisterForm {
    /// Checks shape only; username uniqueness is the store's call.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();

        let username_len = self.username.trim().chars().count();
        if username_len == 0 {
            errors.insert("username", REQUIRED.into());
        } else if !(4..=64).contains(&username_len) {
            errors.insert("username", "Field must be between 4 and 64 characters long.".into());
        }

        if self.email.trim().is_empty() {
            errors.insert("email", REQUIRED.into());
        } else if !self.email.contains('@') {
            errors.insert("email", "Invalid email address.".into());
        } else if self.email.chars().count() > 120 {
            errors.insert("email", "Field cannot be longer than 120 characters.".into());
        }

        if self.password.is_empty() {
            errors.insert("password", REQUIRED.into());
        } else if self.password.chars().count() < 6 {
            errors.insert("password", "Field must be at least 6 characters long.".into());
        }

        if self.password2 != self.password {
            errors.insert("password2", "Passwords do not match.".into());
        }

        finish(errors, ())
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ItemForm {
    pub part_name: String,
    pub description: String,
    pub origin_part_number: String,
    pub vendor_part_number: String,
    pub cost: String,
    pub quantity: String,
    pub min_on_hand: String,
    pub location: String,
    pub manufacturer: String,
    pub notes: String,
}

impl ItemForm {
    pub fn validate(&self) -> Result<ItemInput, FieldErrors> {
        let mut errors = FieldErrors::new();

        if self.part_name.trim().is_empty() {
            errors.insert("part_name", REQUIRED.into());
        }

        let cost = match self.cost.trim() {
            "" => None,
            raw => match raw.parse::<f64>() {
                Ok(cost) if cost.is_finite() && cost >= 0.0 => Some(cost),
                Ok(_) => {
                    errors.insert("cost", "Number must be at least 0.".into());
                    None
                }
                Err(_) => {
                    errors.insert("cost", "Not a valid float value.".into());
                    None
                }
            },
        };

        let quantity = non_negative_integer(&self.quantity, "quantity", &mut errors);
        let min_on_hand = non_negative_integer(&self.min_on_hand, "min_on_hand", &mut errors);

        let input = ItemInput {
            part_name: self.part_name.clone(),
            description: optional_text(&self.description),
            origin_part_number: optional_text(&self.origin_part_number),
            vendor_part_number: optional_text(&self.vendor_part_number),
            cost,
            quantity: quantity.unwrap_or_default(),
            min_on_hand: min_on_hand.unwrap_or_default(),
            location: optional_text(&self.location),
            manufacturer: optional_text(&self.manufacturer),
            notes: optional_text(&self.notes),
        };
        finish(errors, input)
    }
}

impl From<&InventoryItem> for ItemForm {
    fn from(item: &InventoryItem) -> Self {
        let text = |value: &Option<String>| value.clone().unwrap_or_default();
        Self {
            part_name: item.part_name.clone(),
            description: text(&item.description),
            origin_part_number: text(&item.origin_part_number),
            vendor_part_number: text(&item.vendor_part_number),
            cost: item.cost.map(|c| c.to_string()).unwrap_or_default(),
            quantity: item.quantity.to_string(),
            min_on_hand: item.min_on_hand.to_string(),
            location: text(&item.location),
            manufacturer: text(&item.manufacturer),
            notes: text(&item.notes),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct SearchForm {
    pub search_term: String,
    pub field: String,
    #[serde(skip_serializing)]
    pub page: String,
}

impl SearchForm {
    pub fn validate(&self) -> Result<SearchCriteria, FieldErrors> {
        let mut errors = FieldErrors::new();
        let field = match self.field.parse::<SearchField>() {
            Ok(field) => field,
            Err(message) => {
                errors.insert("field", message);
                SearchField::All
            }
        };
        let criteria = SearchCriteria {
            search_term: optional_text(self.search_term.trim()),
            field,
        };
        finish(errors, criteria)
    }
}

/// Reads a `?page=` value; anything that is not an integer means the first page.
pub fn page_number(raw: &str) -> i64 {
    raw.trim().parse().unwrap_or(1)
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct ScanForm {
    pub part_number: String,
    pub quantity: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanInput {
    pub part_number: i64,
    pub quantity: i64,
}

impl ScanForm {
    pub fn validate(&self) -> Result<ScanInput, FieldErrors> {
        let mut errors = FieldErrors::new();

        let part_number = match self.part_number.trim() {
            "" => {
                errors.insert("part_number", REQUIRED.into());
                0
            }
            raw => raw.parse::<i64>().unwrap_or_else(|_| {
                errors.insert("part_number", "Not a valid integer value.".into());
                0
            }),
        };

        let quantity = match self.quantity.trim() {
            "" => {
                errors.insert("quantity", REQUIRED.into());
                0
            }
            raw => match raw.parse::<i64>() {
                Ok(q) if q >= 1 => q,
                Ok(_) => {
                    errors.insert("quantity", "Number must be at least 1.".into());
                    0
                }
                Err(_) => {
                    errors.insert("quantity", "Not a valid integer value.".into());
                    0
                }
            },
        };

        finish(
            errors,
            ScanInput {
                part_number,
                quantity,
            },
        )
    }
}

fn non_negative_integer(raw: &str, field: &'static str, errors: &mut FieldErrors) -> Option<i64> {
    match raw.trim() {
        "" => {
            errors.insert(field, REQUIRED.into());
            None
        }
        raw => match raw.parse::<i64>() {
            Ok(value) if value >= 0 => Some(value),
            Ok(_) => {
                errors.insert(field, "Number must be at least 0.".into());
                None
            }
            Err(_) => {
                errors.insert(field, "Not a valid integer value.".into());
                None
            }
        },
    }
}

fn finish<T>(errors: FieldErrors, value: T) -> Result<T, FieldErrors> {
    if errors.is_empty() {
        Ok(value)
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_form() -> ItemForm {
        ItemForm {
            part_name: "Hex bolt".into(),
            quantity: "0".into(),
            min_on_hand: "5".into(),
            ..ItemForm::default()
        }
    }

    #[test]
    fn accepts_zero_quantity_and_blank_optionals() {
        let input = item_form().validate().unwrap();
        assert_eq!(input.quantity, 0);
        assert_eq!(input.min_on_hand, 5);
        assert_eq!(input.cost, None);
        assert_eq!(input.description, None);
    }

    #[test]
    fn reports_each_bad_item_field() {
        let form = ItemForm {
            part_name: "   ".into(),
            cost: "-1".into(),
            quantity: "-3".into(),
            min_on_hand: "lots".into(),
            ..ItemForm::default()
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors["part_name"], REQUIRED);
        assert_eq!(errors["cost"], "Number must be at least 0.");
        assert_eq!(errors["quantity"], "Number must be at least 0.");
        assert_eq!(errors["min_on_hand"], "Not a valid integer value.");
    }

    #[test]
    fn item_form_round_trips_through_stored_item() {
        let item = InventoryItem {
            part_number: 9,
            part_name: "Hinge".into(),
            description: Some("Brass".into()),
            origin_part_number: None,
            vendor_part_number: Some("1603A12".into()),
            cost: Some(4.25),
            quantity: 12,
            min_on_hand: 3,
            location: None,
            manufacturer: Some("Stanley".into()),
            notes: None,
        };
        let input = ItemForm::from(&item).validate().unwrap();
        assert_eq!(input, ItemInput::from(&item));
    }

    #[test]
    fn rejects_unknown_search_field() {
        let form = SearchForm {
            search_term: "bolt".into(),
            field: "location".into(),
            page: String::new(),
        };
        assert!(form.validate().unwrap_err().contains_key("field"));
    }

    #[test]
    fn unparsable_page_falls_back_to_first() {
        assert_eq!(page_number("3"), 3);
        assert_eq!(page_number(" 2 "), 2);
        assert_eq!(page_number("abc"), 1);
        assert_eq!(page_number(""), 1);
        assert_eq!(page_number("99999999999999999999"), 1);
    }

    #[test]
    fn blank_search_field_means_all() {
        let criteria = SearchForm::default().validate().unwrap();
        assert_eq!(criteria.field, SearchField::All);
        assert_eq!(criteria.search_term, None);
    }

    #[test]
    fn scan_quantity_must_be_positive() {
        let form = ScanForm {
            part_number: "12".into(),
            quantity: "0".into(),
        };
        assert!(form.validate().unwrap_err().contains_key("quantity"));

        let form = ScanForm {
            part_number: "12".into(),
            quantity: "3".into(),
        };
        assert_eq!(
            form.validate().unwrap(),
            ScanInput {
                part_number: 12,
                quantity: 3
            }
        );
    }

    #[test]
    fn register_checks_lengths_and_matching_passwords() {
        let form = RegisterForm {
            username: "bob".into(),
            email: "bob.example.com".into(),
            password: "secret".into(),
            password2: "secrets".into(),
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.contains_key("username"));
        assert!(errors.contains_key("email"));
        assert!(errors.contains_key("password2"));
        assert!(!errors.contains_key("password"));
    }
}
