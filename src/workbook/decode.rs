//! XLSX decoding: ZIP + streaming XML → [`Workbook`].
//!
//! Only the parts that carry cell data are read: the workbook part (sheet
//! order and the 1904 flag), its relationships (where the other parts
//! live), shared strings, the style table (to tell dates from plain
//! numbers) and each worksheet. Formatting, merged ranges, formulas and
//! everything else OOXML can express are ignored; for formula cells the
//! cached `<v>` result is kept.
//!
//! Parsing is namespace-agnostic on purpose: element names are matched by
//! local name and the sheet `r:id` attribute by its `:id` suffix, so
//! producers that pick unusual prefixes still decode.

use std::collections::{BTreeMap, HashMap};
use std::io::BufReader;
use std::io::Cursor;

use quick_xml::events::attributes::Attribute;
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, warn};
use zip::result::ZipError;
use zip::ZipArchive;

use super::dates::{builtin_format_is_date, is_date_format};
use super::{Cell, DecodeError, Sheet, Workbook};

type XlsxArchive<'a> = ZipArchive<Cursor<&'a [u8]>>;

const WORKBOOK_PART: &str = "xl/workbook.xml";
const RELS_PART: &str = "xl/_rels/workbook.xml.rels";

/// Decode XLSX bytes into a [`Workbook`]. One pass over the archive;
/// sheets come back in the order `workbook.xml` lists them.
pub fn decode(bytes: &[u8]) -> Result<Workbook, DecodeError> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|e| DecodeError::Archive(e.to_string()))?;

    let rels = read_relationships(&mut archive)?;
    let (sheet_refs, date1904) = read_workbook(&mut archive, &rels)?;
    let shared = read_shared_strings(&mut archive, rels.shared_strings.as_deref())?;
    let date_styles = read_date_styles(&mut archive, rels.styles.as_deref())?;

    debug!(
        sheets = sheet_refs.len(),
        shared_strings = shared.len(),
        date1904,
        "decoding workbook"
    );

    let mut sheets = Vec::with_capacity(sheet_refs.len());
    for sheet_ref in &sheet_refs {
        sheets.push(read_sheet(&mut archive, sheet_ref, &shared, &date_styles)?);
    }
    Ok(Workbook { sheets, date1904 })
}

// ── Workbook-level parts ────────────────────────────────────────────────

#[derive(Default)]
struct Relationships {
    /// Relationship id → worksheet part path.
    worksheets: HashMap<String, String>,
    shared_strings: Option<String>,
    styles: Option<String>,
}

struct SheetRef {
    name: String,
    path: String,
}

fn read_relationships(archive: &mut XlsxArchive<'_>) -> Result<Relationships, DecodeError> {
    let file = match archive.by_name(RELS_PART) {
        Ok(file) => file,
        // Without a rels part the conventional paths still apply.
        Err(ZipError::FileNotFound) => return Ok(Relationships::default()),
        Err(e) => return Err(DecodeError::Archive(e.to_string())),
    };
    let mut xml = Reader::from_reader(BufReader::new(file));
    xml.trim_text(true);

    let mut rels = Relationships::default();
    let mut buf = Vec::new();
    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let mut id = None;
                let mut target = None;
                let mut rel_type = None;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"Id" => id = attr_str(&attr),
                        b"Target" => target = attr_str(&attr),
                        b"Type" => rel_type = attr_str(&attr),
                        _ => {}
                    }
                }
                if let (Some(id), Some(target), Some(rel_type)) = (id, target, rel_type) {
                    let path = resolve_target(&target);
                    if rel_type.ends_with("/worksheet") {
                        rels.worksheets.insert(id, path);
                    } else if rel_type.ends_with("/sharedStrings") {
                        rels.shared_strings = Some(path);
                    } else if rel_type.ends_with("/styles") {
                        rels.styles = Some(path);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(xml_error(RELS_PART, e)),
        }
        buf.clear();
    }
    Ok(rels)
}

/// Relationship targets are relative to `xl/` unless rooted with `/`.
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(rooted) => rooted.to_string(),
        None => format!("xl/{target}"),
    }
}

fn read_workbook(
    archive: &mut XlsxArchive<'_>,
    rels: &Relationships,
) -> Result<(Vec<SheetRef>, bool), DecodeError> {
    let file = match archive.by_name(WORKBOOK_PART) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => {
            return Err(DecodeError::MissingPart(WORKBOOK_PART.to_string()))
        }
        Err(e) => return Err(DecodeError::Archive(e.to_string())),
    };
    let mut xml = Reader::from_reader(BufReader::new(file));
    xml.trim_text(true);

    let mut sheet_refs = Vec::new();
    let mut date1904 = false;
    let mut buf = Vec::new();
    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"sheet" => {
                    let mut name = None;
                    let mut rid = None;
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"name" {
                            name = attr_unescaped(&attr);
                        } else if attr.key.as_ref().ends_with(b":id") {
                            rid = attr_str(&attr);
                        }
                    }
                    if let Some(name) = name {
                        let path = rid
                            .and_then(|rid| rels.worksheets.get(&rid).cloned())
                            .unwrap_or_else(|| {
                                format!("xl/worksheets/sheet{}.xml", sheet_refs.len() + 1)
                            });
                        sheet_refs.push(SheetRef { name, path });
                    }
                }
                b"workbookPr" => {
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"date1904" {
                            let value = attr_str(&attr).unwrap_or_default();
                            date1904 = value == "1" || value.eq_ignore_ascii_case("true");
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(xml_error(WORKBOOK_PART, e)),
        }
        buf.clear();
    }
    Ok((sheet_refs, date1904))
}

fn read_shared_strings(
    archive: &mut XlsxArchive<'_>,
    path: Option<&str>,
) -> Result<Vec<String>, DecodeError> {
    let path = path.unwrap_or("xl/sharedStrings.xml");
    let file = match archive.by_name(path) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(Vec::new()),
        Err(e) => return Err(DecodeError::Archive(e.to_string())),
    };
    let mut xml = Reader::from_reader(BufReader::new(file));
    // Whitespace inside <t> is significant.
    xml.trim_text(false);

    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_item = false;
    let mut in_text = false;
    let mut buf = Vec::new();
    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => {
                    in_item = true;
                    current.clear();
                }
                // Rich-text runs split one item across several <t>; the
                // runs concatenate.
                b"t" if in_item => in_text = true,
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                let text = t.unescape().map_err(|e| xml_error(path, e))?;
                current.push_str(&text);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"si" => {
                    in_item = false;
                    strings.push(std::mem::take(&mut current));
                }
                b"t" => in_text = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(xml_error(path, e)),
        }
        buf.clear();
    }
    Ok(strings)
}

/// Per-style "renders as a date" table, indexed by the `s` attribute of a
/// cell. Styles resolve through `cellXfs` to either a built-in format id
/// or a custom format code.
fn read_date_styles(
    archive: &mut XlsxArchive<'_>,
    path: Option<&str>,
) -> Result<Vec<bool>, DecodeError> {
    let path = path.unwrap_or("xl/styles.xml");
    let file = match archive.by_name(path) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(Vec::new()),
        Err(e) => return Err(DecodeError::Archive(e.to_string())),
    };
    let mut xml = Reader::from_reader(BufReader::new(file));
    xml.trim_text(true);

    let mut custom_formats: HashMap<u32, String> = HashMap::new();
    let mut format_ids: Vec<u32> = Vec::new();
    let mut in_cell_xfs = false;
    let mut buf = Vec::new();
    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"cellXfs" => in_cell_xfs = true,
                b"numFmt" => {
                    let mut id = None;
                    let mut code = None;
                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"numFmtId" => id = attr_str(&attr).and_then(|s| s.parse().ok()),
                            b"formatCode" => code = attr_unescaped(&attr),
                            _ => {}
                        }
                    }
                    if let (Some(id), Some(code)) = (id, code) {
                        custom_formats.insert(id, code);
                    }
                }
                // Only cellXfs entries are addressable from cells; the
                // cellStyleXfs table uses the same element name.
                b"xf" if in_cell_xfs => {
                    let id = e
                        .attributes()
                        .flatten()
                        .find(|attr| attr.key.as_ref() == b"numFmtId")
                        .and_then(|attr| attr_str(&attr))
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(0);
                    format_ids.push(id);
                }
                _ => {}
            },
            Ok(Event::End(e)) if e.local_name().as_ref() == b"cellXfs" => in_cell_xfs = false,
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(xml_error(path, e)),
        }
        buf.clear();
    }

    Ok(format_ids
        .iter()
        .map(|id| {
            builtin_format_is_date(*id)
                || custom_formats
                    .get(id)
                    .is_some_and(|code| is_date_format(code))
        })
        .collect())
}

// ── Worksheet cells ─────────────────────────────────────────────────────

fn read_sheet(
    archive: &mut XlsxArchive<'_>,
    sheet_ref: &SheetRef,
    shared: &[String],
    date_styles: &[bool],
) -> Result<Sheet, DecodeError> {
    let file = match archive.by_name(&sheet_ref.path) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => {
            return Err(DecodeError::MissingPart(sheet_ref.path.clone()))
        }
        Err(e) => return Err(DecodeError::Archive(e.to_string())),
    };
    let mut xml = Reader::from_reader(BufReader::new(file));
    xml.trim_text(true);

    let mut cells = BTreeMap::new();
    let mut buf = Vec::new();

    // State of the <c> element currently being assembled.
    let mut position: Option<(u32, u32)> = None;
    let mut cell_type: Option<String> = None;
    let mut style_index: Option<usize> = None;
    let mut value: Option<String> = None;
    let mut in_value = false;
    let mut in_inline_text = false;

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"c" => {
                position = None;
                cell_type = None;
                style_index = None;
                value = None;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"r" => {
                            if let Some(reference) = attr_str(&attr) {
                                match parse_cell_ref(&reference) {
                                    Some(pos) => position = Some(pos),
                                    None => {
                                        return Err(DecodeError::CellReference {
                                            sheet: sheet_ref.name.clone(),
                                            reference,
                                        })
                                    }
                                }
                            }
                        }
                        b"t" => cell_type = attr_str(&attr),
                        b"s" => style_index = attr_str(&attr).and_then(|s| s.parse().ok()),
                        _ => {}
                    }
                }
            }
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"v" => in_value = true,
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_inline_text = true,
            // Formula text lives in <f> and stays ignored; only <v> and
            // inline <t> content is captured.
            Ok(Event::Text(t)) if in_value || in_inline_text => {
                let text = t.unescape().map_err(|e| xml_error(&sheet_ref.path, e))?;
                match &mut value {
                    Some(v) => v.push_str(&text),
                    None => value = Some(text.into_owned()),
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"v" => in_value = false,
                b"t" => in_inline_text = false,
                b"c" => {
                    if let (Some(pos), Some(raw)) = (position.take(), value.take()) {
                        if !raw.is_empty() {
                            let cell = classify_cell(
                                &sheet_ref.name,
                                &raw,
                                cell_type.as_deref(),
                                style_index,
                                shared,
                                date_styles,
                            )?;
                            cells.insert(pos, cell);
                        }
                    }
                    cell_type = None;
                    style_index = None;
                    in_value = false;
                    in_inline_text = false;
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(xml_error(&sheet_ref.path, e)),
        }
        buf.clear();
    }

    Ok(Sheet::from_cells(sheet_ref.name.clone(), cells))
}

fn classify_cell(
    sheet_name: &str,
    raw: &str,
    cell_type: Option<&str>,
    style_index: Option<usize>,
    shared: &[String],
    date_styles: &[bool],
) -> Result<Cell, DecodeError> {
    match cell_type {
        Some("s") => {
            let resolved = raw.trim().parse::<usize>().ok().and_then(|i| shared.get(i));
            match resolved {
                Some(text) => Ok(Cell::Text(text.clone())),
                None => Err(DecodeError::SharedString {
                    reference: raw.to_string(),
                    count: shared.len(),
                }),
            }
        }
        Some("str") | Some("inlineStr") => Ok(Cell::Text(raw.to_string())),
        Some("b") => Ok(Cell::Text(
            if raw.trim() == "0" { "FALSE" } else { "TRUE" }.to_string(),
        )),
        // Error cells (#DIV/0! and friends) keep their literal marker.
        Some("e") => Ok(Cell::Text(raw.to_string())),
        None | Some("n") => match raw.trim().parse::<f64>() {
            Ok(number) => {
                let is_date = style_index
                    .and_then(|i| date_styles.get(i))
                    .copied()
                    .unwrap_or(false);
                Ok(if is_date {
                    Cell::Date(number)
                } else {
                    Cell::Number(number)
                })
            }
            Err(_) => {
                warn!(sheet = sheet_name, value = raw, "unparseable number, keeping text");
                Ok(Cell::Text(raw.to_string()))
            }
        },
        Some(other) => {
            warn!(sheet = sheet_name, cell_type = other, "unknown cell type, keeping text");
            Ok(Cell::Text(raw.to_string()))
        }
    }
}

/// `"BC23"` → 0-indexed `(row 22, col 54)`.
fn parse_cell_ref(reference: &str) -> Option<(u32, u32)> {
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() {
        return None;
    }
    let mut col: u32 = 0;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let ordinal = (ch.to_ascii_uppercase() as u32) - ('A' as u32) + 1;
        col = col.checked_mul(26)?.checked_add(ordinal)?;
    }
    let row: u32 = digits.parse().ok()?;
    if row == 0 {
        return None;
    }
    Some((row - 1, col - 1))
}

fn attr_str(attr: &Attribute<'_>) -> Option<String> {
    std::str::from_utf8(&attr.value).ok().map(str::to_string)
}

fn attr_unescaped(attr: &Attribute<'_>) -> Option<String> {
    attr.unescape_value().ok().map(|v| v.into_owned())
}

fn xml_error(part: &str, err: quick_xml::Error) -> DecodeError {
    DecodeError::Xml {
        part: part.to_string(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;

    fn build_xlsx(parts: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, xml) in parts {
            writer
                .start_file(
                    *name,
                    FileOptions::default().compression_method(zip::CompressionMethod::Deflated),
                )
                .unwrap();
            writer.write_all(xml.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>
<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#;

    const WORKBOOK: &str = r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#;

    const SHARED: &str = r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="2" uniqueCount="2">
<si><t>Name</t></si><si><t>携程</t></si>
</sst>"#;

    const STYLES: &str = r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<numFmts count="1"><numFmt numFmtId="164" formatCode="yyyy\-mm\-dd"/></numFmts>
<cellXfs count="3">
<xf numFmtId="0" fontId="0" fillId="0" borderId="0"/>
<xf numFmtId="14" applyNumberFormat="1"/>
<xf numFmtId="164" applyNumberFormat="1"/>
</cellXfs>
</styleSheet>"#;

    const SHEET1: &str = r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<sheetData>
<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row>
<row r="2"><c r="A2"><v>42.5</v></c><c r="B2" s="1"><v>45658</v></c></row>
<row r="3"><c r="A3" t="inlineStr"><is><t>inline text</t></is></c><c r="B3" t="b"><v>1</v></c></row>
</sheetData>
</worksheet>"#;

    fn standard_fixture() -> Vec<u8> {
        build_xlsx(&[
            ("xl/_rels/workbook.xml.rels", RELS),
            ("xl/workbook.xml", WORKBOOK),
            ("xl/sharedStrings.xml", SHARED),
            ("xl/styles.xml", STYLES),
            ("xl/worksheets/sheet1.xml", SHEET1),
        ])
    }

    #[test]
    fn decodes_shared_inline_number_bool_and_date_cells() {
        let workbook = decode(&standard_fixture()).unwrap();
        assert!(!workbook.date1904);
        assert_eq!(workbook.sheet_names(), vec!["Sheet1"]);

        let sheet = workbook.first_sheet().unwrap();
        assert_eq!(sheet.cell(0, 0), Some(&Cell::Text("Name".into())));
        assert_eq!(sheet.cell(0, 1), Some(&Cell::Text("携程".into())));
        assert_eq!(sheet.cell(1, 0), Some(&Cell::Number(42.5)));
        assert_eq!(sheet.cell(1, 1), Some(&Cell::Date(45658.0)));
        assert_eq!(sheet.cell(2, 0), Some(&Cell::Text("inline text".into())));
        assert_eq!(sheet.cell(2, 1), Some(&Cell::Text("TRUE".into())));

        let range = sheet.used_range.unwrap();
        assert_eq!((range.min_row, range.min_col), (0, 0));
        assert_eq!((range.max_row, range.max_col), (2, 1));
    }

    #[test]
    fn sheet_order_follows_workbook_xml_not_archive_order() {
        let rels = r#"<Relationships>
<Relationship Id="rId1" Type=".../worksheet" Target="worksheets/data.xml"/>
<Relationship Id="rId2" Type=".../worksheet" Target="worksheets/summary.xml"/>
</Relationships>"#;
        let workbook_xml = r#"<workbook xmlns:r="r">
<sheets>
<sheet name="Summary" sheetId="1" r:id="rId2"/>
<sheet name="Data" sheetId="2" r:id="rId1"/>
</sheets>
</workbook>"#;
        let sheet = r#"<worksheet><sheetData><row r="1"><c r="A1"><v>1</v></c></row></sheetData></worksheet>"#;
        // Archive order is the reverse of workbook order.
        let bytes = build_xlsx(&[
            ("xl/worksheets/data.xml", sheet),
            ("xl/worksheets/summary.xml", sheet),
            ("xl/workbook.xml", workbook_xml),
            ("xl/_rels/workbook.xml.rels", rels),
        ]);
        let workbook = decode(&bytes).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["Summary", "Data"]);
    }

    #[test]
    fn date1904_flag_is_read_from_workbook_pr() {
        let workbook_xml = r#"<workbook>
<workbookPr date1904="1"/>
<sheets><sheet name="S" sheetId="1"/></sheets>
</workbook>"#;
        let sheet = r#"<worksheet><sheetData/></worksheet>"#;
        let bytes = build_xlsx(&[
            ("xl/workbook.xml", workbook_xml),
            ("xl/worksheets/sheet1.xml", sheet),
        ]);
        assert!(decode(&bytes).unwrap().date1904);
    }

    #[test]
    fn missing_rels_falls_back_to_conventional_paths() {
        let workbook_xml = r#"<workbook><sheets><sheet name="Only" sheetId="1"/></sheets></workbook>"#;
        let sheet = r#"<worksheet><sheetData><row r="1"><c r="A1"><v>7</v></c></row></sheetData></worksheet>"#;
        let bytes = build_xlsx(&[
            ("xl/workbook.xml", workbook_xml),
            ("xl/worksheets/sheet1.xml", sheet),
        ]);
        let workbook = decode(&bytes).unwrap();
        assert_eq!(
            workbook.first_sheet().unwrap().cell(0, 0),
            Some(&Cell::Number(7.0))
        );
    }

    #[test]
    fn rooted_relationship_targets_resolve() {
        let rels = r#"<Relationships>
<Relationship Id="rId1" Type=".../worksheet" Target="/xl/worksheets/sheet1.xml"/>
</Relationships>"#;
        let workbook_xml = r#"<workbook xmlns:r="r"><sheets><sheet name="S" r:id="rId1"/></sheets></workbook>"#;
        let sheet = r#"<worksheet><sheetData><row r="1"><c r="A1"><v>1</v></c></row></sheetData></worksheet>"#;
        let bytes = build_xlsx(&[
            ("xl/_rels/workbook.xml.rels", rels),
            ("xl/workbook.xml", workbook_xml),
            ("xl/worksheets/sheet1.xml", sheet),
        ]);
        assert_eq!(decode(&bytes).unwrap().sheets[0].cells.len(), 1);
    }

    #[test]
    fn shared_string_reference_out_of_range_errors() {
        let sheet = r#"<worksheet><sheetData><row r="1"><c r="A1" t="s"><v>99</v></c></row></sheetData></worksheet>"#;
        let bytes = build_xlsx(&[
            ("xl/_rels/workbook.xml.rels", RELS),
            ("xl/workbook.xml", WORKBOOK),
            ("xl/sharedStrings.xml", SHARED),
            ("xl/worksheets/sheet1.xml", sheet),
        ]);
        match decode(&bytes) {
            Err(DecodeError::SharedString { reference, count }) => {
                assert_eq!(reference, "99");
                assert_eq!(count, 2);
            }
            other => panic!("expected SharedString error, got {other:?}"),
        }
    }

    #[test]
    fn garbage_bytes_are_not_an_archive() {
        assert!(matches!(
            decode(b"definitely not a zip file"),
            Err(DecodeError::Archive(_))
        ));
    }

    #[test]
    fn archive_without_workbook_part_errors() {
        let bytes = build_xlsx(&[("xl/_rels/workbook.xml.rels", RELS)]);
        match decode(&bytes) {
            Err(DecodeError::MissingPart(part)) => assert_eq!(part, "xl/workbook.xml"),
            other => panic!("expected MissingPart, got {other:?}"),
        }
    }

    #[test]
    fn listed_worksheet_missing_from_archive_errors() {
        let bytes = build_xlsx(&[
            ("xl/_rels/workbook.xml.rels", RELS),
            ("xl/workbook.xml", WORKBOOK),
        ]);
        assert!(matches!(decode(&bytes), Err(DecodeError::MissingPart(_))));
    }

    #[test]
    fn error_cells_and_unknown_types_keep_raw_text() {
        let sheet = r#"<worksheet><sheetData>
<row r="1"><c r="A1" t="e"><v>#DIV/0!</v></c><c r="B1" t="weird"><v>x</v></c></row>
</sheetData></worksheet>"#;
        let bytes = build_xlsx(&[
            ("xl/workbook.xml", r#"<workbook><sheets><sheet name="S" sheetId="1"/></sheets></workbook>"#),
            ("xl/worksheets/sheet1.xml", sheet),
        ]);
        let workbook = decode(&bytes).unwrap();
        let cells = &workbook.sheets[0];
        assert_eq!(cells.cell(0, 0), Some(&Cell::Text("#DIV/0!".into())));
        assert_eq!(cells.cell(0, 1), Some(&Cell::Text("x".into())));
    }

    #[test]
    fn valueless_cells_stay_out_of_the_model() {
        let sheet = r#"<worksheet><sheetData>
<row r="1"><c r="A1"/><c r="B1"><v></v></c><c r="C1" s="2"/></row>
</sheetData></worksheet>"#;
        let bytes = build_xlsx(&[
            ("xl/workbook.xml", r#"<workbook><sheets><sheet name="S" sheetId="1"/></sheets></workbook>"#),
            ("xl/worksheets/sheet1.xml", sheet),
        ]);
        let workbook = decode(&bytes).unwrap();
        assert!(workbook.sheets[0].is_empty());
        assert!(workbook.sheets[0].used_range.is_none());
    }

    #[test]
    fn custom_date_format_classifies_serial_as_date() {
        let sheet = r#"<worksheet><sheetData>
<row r="1"><c r="A1" s="2"><v>44197</v></c></row>
</sheetData></worksheet>"#;
        let bytes = build_xlsx(&[
            ("xl/_rels/workbook.xml.rels", RELS),
            ("xl/workbook.xml", WORKBOOK),
            ("xl/styles.xml", STYLES),
            ("xl/worksheets/sheet1.xml", sheet),
        ]);
        let workbook = decode(&bytes).unwrap();
        assert_eq!(workbook.sheets[0].cell(0, 0), Some(&Cell::Date(44197.0)));
    }

    #[test]
    fn cached_formula_results_are_kept_formula_text_ignored() {
        let sheet = r#"<worksheet><sheetData>
<row r="1"><c r="A1"><f>SUM(1,2)</f><v>3</v></c></row>
</sheetData></worksheet>"#;
        let bytes = build_xlsx(&[
            ("xl/workbook.xml", r#"<workbook><sheets><sheet name="S" sheetId="1"/></sheets></workbook>"#),
            ("xl/worksheets/sheet1.xml", sheet),
        ]);
        let workbook = decode(&bytes).unwrap();
        assert_eq!(workbook.sheets[0].cell(0, 0), Some(&Cell::Number(3.0)));
    }

    #[test]
    fn entity_escapes_unescape_in_shared_strings() {
        let shared = r#"<sst><si><t>A &amp; B</t></si></sst>"#;
        let sheet = r#"<worksheet><sheetData><row r="1"><c r="A1" t="s"><v>0</v></c></row></sheetData></worksheet>"#;
        let bytes = build_xlsx(&[
            ("xl/_rels/workbook.xml.rels", RELS),
            ("xl/workbook.xml", WORKBOOK),
            ("xl/sharedStrings.xml", shared),
            ("xl/worksheets/sheet1.xml", sheet),
        ]);
        let workbook = decode(&bytes).unwrap();
        assert_eq!(workbook.sheets[0].cell(0, 0), Some(&Cell::Text("A & B".into())));
    }

    #[test]
    fn rich_text_runs_concatenate() {
        let shared = r#"<sst><si><r><t>Hello </t></r><r><t>world</t></r></si></sst>"#;
        let sheet = r#"<worksheet><sheetData><row r="1"><c r="A1" t="s"><v>0</v></c></row></sheetData></worksheet>"#;
        let bytes = build_xlsx(&[
            ("xl/_rels/workbook.xml.rels", RELS),
            ("xl/workbook.xml", WORKBOOK),
            ("xl/sharedStrings.xml", shared),
            ("xl/worksheets/sheet1.xml", sheet),
        ]);
        let workbook = decode(&bytes).unwrap();
        assert_eq!(
            workbook.sheets[0].cell(0, 0),
            Some(&Cell::Text("Hello world".into()))
        );
    }

    #[test]
    fn malformed_cell_reference_errors() {
        let sheet = r#"<worksheet><sheetData><row r="1"><c r="!!bad"><v>1</v></c></row></sheetData></worksheet>"#;
        let bytes = build_xlsx(&[
            ("xl/workbook.xml", r#"<workbook><sheets><sheet name="Bad" sheetId="1"/></sheets></workbook>"#),
            ("xl/worksheets/sheet1.xml", sheet),
        ]);
        match decode(&bytes) {
            Err(DecodeError::CellReference { sheet, reference }) => {
                assert_eq!(sheet, "Bad");
                assert_eq!(reference, "!!bad");
            }
            other => panic!("expected CellReference error, got {other:?}"),
        }
    }

    #[test]
    fn cell_reference_parsing() {
        assert_eq!(parse_cell_ref("A1"), Some((0, 0)));
        assert_eq!(parse_cell_ref("B3"), Some((2, 1)));
        assert_eq!(parse_cell_ref("Z1"), Some((0, 25)));
        assert_eq!(parse_cell_ref("AA1"), Some((0, 26)));
        assert_eq!(parse_cell_ref("BC23"), Some((22, 54)));
        assert_eq!(parse_cell_ref(""), None);
        assert_eq!(parse_cell_ref("123"), None);
        assert_eq!(parse_cell_ref("ABC"), None);
        assert_eq!(parse_cell_ref("A0"), None);
    }
}
