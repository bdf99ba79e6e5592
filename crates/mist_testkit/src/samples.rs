//! Sample import payloads.
//!
//! Shapes follow the files users actually upload: a Google Contacts CSV
//! export and note archives in both supported formats.

/// Google Contacts CSV export with three contacts.
///
/// - Ada has two mobile numbers in one cell, a home address with a house
///   number and belongs to `Family` and `Science`
/// - Grace has only a `Name`, a work e-mail and belongs to `Navy`
/// - Alan has a year-less birthday and two work addresses in one cell
pub const GOOGLE_CSV: &str = concat!(
    "Name,Given Name,Additional Name,Family Name,Nickname,Birthday,Notes,Group Membership,",
    "E-mail 1 - Type,E-mail 1 - Value,Phone 1 - Type,Phone 1 - Value,",
    "Address 1 - Type,Address 1 - Formatted,Address 1 - Street,Address 1 - City,",
    "Address 1 - Postal Code,Address 1 - Country,Organization 1 - Name,Website 1 - Value\n",
    "Ada Lovelace,Ada,Augusta,Lovelace,,1815-12-10,Analyst,* My Contacts ::: Family ::: Science,",
    "Home,ada@example.org,Mobile,555-1111 ::: 555-2222,",
    "Home,\"12 St James's Square, London\",St James's Square 12,London,SW1Y,UK,,\n",
    "Grace Hopper,,,,Amazing Grace,,,Navy,",
    "Work,grace@navy.example,,,",
    ",,,,,,US Navy,https://navy.example\n",
    "Alan Turing,Alan,,Turing,,--06-23,,* My Contacts ::: Science,",
    ",,Work Fax,555-3333,",
    "Work,Bletchley Park ::: Manchester,Sherwood Drive 3 ::: Oxford Road,Bletchley ::: Manchester,",
    "MK3 ::: M13,UK ::: UK,,\n",
);

/// The same two notes as a JSON array.
pub const NOTES_JSON: &str =
    r#"[{"title": "Groceries", "body": "eggs, milk"}, {"title": "Ideas", "pinned": "true"}]"#;

/// The same two notes as an XML archive.
pub const NOTES_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8"?>"#,
    "<notes>",
    "<note><title><![CDATA[Groceries]]></title><body><![CDATA[eggs, milk]]></body></note>",
    "<note><title>Ideas</title><pinned>true</pinned></note>",
    "</notes>",
);

#[cfg(test)]
mod tests {
    use super::*;
    use mist_core::import::{parse_contacts, parse_notes, ImportFormat, NoteFormat};

    #[test]
    fn google_sample_parses() {
        let contacts = parse_contacts(ImportFormat::GoogleCsv, GOOGLE_CSV.as_bytes()).unwrap();
        assert_eq!(contacts.len(), 3);
    }

    #[test]
    fn note_samples_agree() {
        let json = parse_notes(NoteFormat::Json, NOTES_JSON.as_bytes()).unwrap();
        let xml = parse_notes(NoteFormat::Xml, NOTES_XML.as_bytes()).unwrap();
        assert_eq!(json, xml);
    }
}
