//! Google Contacts CSV export.
//!
//! The export has one header row. Repeated fields are numbered
//! (`Phone 1 - Value`, `Phone 2 - Value`, ...) and a single cell may hold
//! several values joined by [`DELIMITER`].

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::error::{CoreError, CoreResult};
use crate::model::{Address, AddressType, Contact, Mail, MailType, Phone, PhoneType};

/// Separator between values packed in one cell.
pub const DELIMITER: &str = " ::: ";

/// Built-in group every Google contact belongs to.
const ALL_CONTACTS_GROUP: &str = "My Contacts";

const FORMAT: &str = "Google CSV";

/// Year given to birthdays exported without one. A leap year so that
/// February 29 stays valid.
const YEARLESS_BIRTHDAY_YEAR: i32 = 1972;

static HOUSE_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r",?\s*(\d+[a-zA-Z]?),?\s*").expect("house number pattern is valid")
});

#[derive(Debug, Clone, Copy)]
enum TextField {
    Nickname,
    Organization,
    Title,
    Note,
    Url,
}

impl TextField {
    fn slot(self, contact: &mut Contact) -> &mut Option<String> {
        match self {
            TextField::Nickname => &mut contact.nickname,
            TextField::Organization => &mut contact.organization,
            TextField::Title => &mut contact.title,
            TextField::Note => &mut contact.note,
            TextField::Url => &mut contact.url,
        }
    }
}

const TEXT_FIELDS: &[(&str, TextField)] = &[
    ("Nickname", TextField::Nickname),
    ("Organization 1 - Name", TextField::Organization),
    ("Organization 1 - Title", TextField::Title),
    ("Notes", TextField::Note),
    ("Website 1 - Value", TextField::Url),
];

const PHONE_TYPES: &[(&str, PhoneType)] = &[
    ("Pager", PhoneType::Pager),
    ("Mobile", PhoneType::Cell),
    ("Work Fax", PhoneType::Fax),
    ("Home Fax", PhoneType::Fax),
    ("Work", PhoneType::Home),
    ("Main", PhoneType::Home),
    ("Home", PhoneType::Home),
];

const MAIL_TYPES: &[(&str, MailType)] = &[
    ("Work", MailType::Professional),
    ("Home", MailType::Personal),
];

const ADDRESS_TYPES: &[(&str, AddressType)] = &[
    ("Work", AddressType::Work),
    ("Home", AddressType::Home),
];

fn lookup<T: Copy>(table: &[(&str, T)], label: Option<&str>, default: T) -> T {
    label
        .and_then(|label| table.iter().find(|(name, _)| *name == label))
        .map_or(default, |(_, value)| *value)
}

/// One CSV row with empty cells removed.
struct Row(HashMap<String, String>);

impl Row {
    fn get(&self, column: &str) -> Option<&str> {
        self.0.get(column).map(String::as_str)
    }

    fn numbered(&self, kind: &str, index: usize, part: &str) -> Option<&str> {
        self.get(&format!("{kind} {index} - {part}"))
    }
}

/// Parses a Google Contacts CSV export into contacts.
///
/// # Errors
///
/// Returns [`CoreError::Parse`] if the text is not well-formed CSV, a row
/// has a different number of cells than the header or a cell is not UTF-8.
/// No contact is returned in that case.
pub fn parse_google_csv(text: &str) -> CoreResult<Vec<Contact>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());
    let headers = reader
        .headers()
        .map_err(|e| CoreError::parse(FORMAT, e.to_string()))?
        .clone();

    let mut contacts = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| CoreError::parse(FORMAT, e.to_string()))?;
        let row = Row(headers
            .iter()
            .zip(record.iter())
            .filter(|(_, value)| !value.is_empty())
            .map(|(column, value)| (column.to_string(), value.to_string()))
            .collect());
        contacts.push(normalize(&row));
    }
    Ok(contacts)
}

fn normalize(row: &Row) -> Contact {
    let mut contact = Contact::new();

    contact.first_name = match (row.get("Given Name"), row.get("Additional Name")) {
        (Some(given), Some(additional)) => Some(format!("{given} {additional}")),
        (given, additional) => given.or(additional).map(ToString::to_string),
    };
    contact.last_name = row.get("Family Name").map(ToString::to_string);
    if contact.first_name.is_none() && contact.last_name.is_none() {
        contact.first_name = row.get("Name").map(ToString::to_string);
    }

    for (column, field) in TEXT_FIELDS {
        if let Some(value) = row.get(column) {
            *field.slot(&mut contact) = Some(value.to_string());
        }
    }
    contact.birthday = row.get("Birthday").and_then(parse_birthday);

    for index in 1.. {
        let Some(cell) = row.numbered("Phone", index, "Value") else {
            break;
        };
        let kind = lookup(PHONE_TYPES, row.numbered("Phone", index, "Type"), PhoneType::Home);
        contact.phones.extend(cell.split(DELIMITER).map(|number| Phone {
            kind,
            number: number.to_string(),
        }));
    }

    for index in 1.. {
        let Some(cell) = row.numbered("E-mail", index, "Value") else {
            break;
        };
        let kind = lookup(MAIL_TYPES, row.numbered("E-mail", index, "Type"), MailType::Personal);
        contact.mails.extend(cell.split(DELIMITER).map(|address| Mail {
            kind,
            address: address.to_string(),
        }));
    }

    for index in 1.. {
        let Some(formatted) = row.numbered("Address", index, "Formatted") else {
            break;
        };
        contact.addresses.extend(addresses(row, index, formatted));
    }

    if let Some(cell) = row.get("Group Membership") {
        for group in cell.split(DELIMITER) {
            let group = group.strip_prefix("* ").unwrap_or(group);
            if group != ALL_CONTACTS_GROUP {
                contact.add_group(group);
            }
        }
    }

    contact
}

/// Builds the addresses of one `Address N` column group.
///
/// When the formatted cell packs several addresses, every sub-field is
/// split on its own and the parts are zipped by position.
fn addresses(row: &Row, index: usize, formatted: &str) -> Vec<Address> {
    let kind = lookup(
        ADDRESS_TYPES,
        row.numbered("Address", index, "Type"),
        AddressType::Home,
    );
    let field = |part: &str| row.numbered("Address", index, part);

    if !formatted.contains(DELIMITER) {
        let mut address = Address::new(kind);
        if let Some(street) = field("Street") {
            let (street, number) = split_house_number(street);
            address.street = non_empty(street);
            address.number = number;
        }
        address.po_box = field("PO Box").map(ToString::to_string);
        address.postal_code = field("Postal Code").map(ToString::to_string);
        address.locality = field("City").map(ToString::to_string);
        address.region = field("Region").map(ToString::to_string);
        address.country = field("Country").map(ToString::to_string);
        return vec![address];
    }

    let parts = |part: &str| {
        field(part).map_or_else(Vec::new, |cell| cell.split(DELIMITER).collect::<Vec<_>>())
    };
    let pick = |values: &[&str], k: usize| values.get(k).and_then(|v| non_empty((*v).to_string()));

    let streets: Vec<(String, Option<String>)> = parts("Street")
        .into_iter()
        .map(split_house_number)
        .collect();
    let boxes = parts("PO Box");
    let postal_codes = parts("Postal Code");
    let cities = parts("City");
    let regions = parts("Region");
    let countries = parts("Country");

    (0..formatted.split(DELIMITER).count())
        .map(|k| {
            let mut address = Address::new(kind);
            if let Some((street, number)) = streets.get(k) {
                address.street = non_empty(street.clone());
                address.number = number.clone();
            }
            address.po_box = pick(&boxes, k);
            address.postal_code = pick(&postal_codes, k);
            address.locality = pick(&cities, k);
            address.region = pick(&regions, k);
            address.country = pick(&countries, k);
            address
        })
        .collect()
}

/// Splits a house number off a street when the street holds exactly one.
fn split_house_number(street: &str) -> (String, Option<String>) {
    let mut matches = HOUSE_NUMBER.captures_iter(street);
    let (Some(only), None) = (matches.next(), matches.next()) else {
        return (street.to_string(), None);
    };
    let number = only.get(1).map(|m| m.as_str().to_string());
    (HOUSE_NUMBER.replace(street, "").into_owned(), number)
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

/// Parses `YYYY-MM-DD` or `--MM-DD` into milliseconds at UTC midnight.
fn parse_birthday(text: &str) -> Option<i64> {
    let date = match text.strip_prefix("--") {
        Some(month_day) => NaiveDate::parse_from_str(
            &format!("{YEARLESS_BIRTHDAY_YEAR}-{month_day}"),
            "%Y-%m-%d",
        ),
        None => NaiveDate::parse_from_str(text, "%Y-%m-%d"),
    }
    .ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis())
}
