//! Plain-text export of a note.

use crate::model::note::Note;
use crate::text::plain::plain_text;

const FALLBACK_FILE_STEM: &str = "note";
const EXPORT_EXTENSION: &str = "txt";

/// Downloadable export payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: String,
    pub body: String,
}

/// Exports `note` as plain text named after its title.
pub fn export_plain_text(note: &Note) -> ExportFile {
    ExportFile {
        file_name: export_file_name(&note.title),
        body: plain_text(&note.content),
    }
}

/// `My Note` becomes `My_Note.txt`; a blank title becomes `note.txt`.
pub fn export_file_name(title: &str) -> String {
    let stem = title.replace(' ', "_");
    let stem = if stem.is_empty() {
        FALLBACK_FILE_STEM
    } else {
        stem.as_str()
    };
    format!("{stem}.{EXPORT_EXTENSION}")
}

#[cfg(test)]
mod tests {
    use super::{export_file_name, export_plain_text};
    use crate::model::note::Note;

    #[test]
    fn file_name_replaces_spaces_and_falls_back() {
        assert_eq!(export_file_name("Shopping list"), "Shopping_list.txt");
        assert_eq!(export_file_name(""), "note.txt");
    }

    #[test]
    fn body_is_plain_text() {
        let note = Note::with_id("n", "Trip", "<p>Pack <b>socks</b></p><p>Go</p>", 1);
        let file = export_plain_text(&note);
        assert_eq!(file.file_name, "Trip.txt");
        assert_eq!(file.body, "Pack socks\nGo");
    }
}
