//! XMP metadata packets.
//!
//! The document keeps its Info entries as plain key/value pairs. The XMP
//! packet is generated from them plus the standards the document claims
//! and its modification history, and can be parsed back.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::profile::{StandardFamily, StandardProfile};

const NS_X: &str = "adobe:ns:meta/";
const NS_RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
const NS_DC: &str = "http://purl.org/dc/elements/1.1/";
const NS_XMP: &str = "http://ns.adobe.com/xap/1.0/";
const NS_PDF: &str = "http://ns.adobe.com/pdf/1.3/";
const NS_XMP_MM: &str = "http://ns.adobe.com/xap/1.0/mm/";
const NS_ST_EVT: &str = "http://ns.adobe.com/xap/1.0/sType/ResourceEvent#";
const NS_PDFAID: &str = "http://www.aiim.org/pdfa/ns/id/";
const NS_PDFUAID: &str = "http://www.aiim.org/pdfua/ns/id/";
const NS_PDFXID: &str = "http://www.npes.org/pdfx/ns/id/";

/// One entry of `xmpMM:History`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Action, e.g. "converted"
    pub action: String,
    /// When it happened
    pub when: Option<DateTime<Utc>>,
    /// Tool that did it
    pub software_agent: Option<String>,
    /// Free-form details
    pub parameters: Option<String>,
}

/// XMP properties that are not derived from the Info entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct XmpMetadata {
    /// Whether the document carries an XMP packet
    pub present: bool,
    /// Standards claimed through pdfaid, pdfuaid and pdfxid
    pub claims: Vec<StandardProfile>,
    /// Modification history
    pub history: Vec<HistoryEntry>,
    /// `xmp:CreateDate`
    pub create_date: Option<DateTime<Utc>>,
    /// `xmp:ModifyDate`
    pub modify_date: Option<DateTime<Utc>>,
}

/// Result of parsing a packet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedXmp {
    /// Non-Info properties
    pub metadata: XmpMetadata,
    /// Info entries recovered from Dublin Core and PDF properties
    pub info: IndexMap<String, String>,
    /// `dc:language`
    pub language: Option<String>,
}

impl XmpMetadata {
    /// Empty, absent metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a history entry stamped now.
    pub fn add_history(&mut self, action: impl Into<String>, parameters: Option<String>) {
        self.history.push(HistoryEntry {
            action: action.into(),
            when: Some(Utc::now()),
            software_agent: Some(format!("pdf_folio {}", env!("CARGO_PKG_VERSION"))),
            parameters,
        });
    }

    /// Claim a standard, keeping at most one claim per family.
    pub fn set_claim(&mut self, claim: StandardProfile) {
        let family = claim.family();
        self.claims.retain(|c| c.family() != family);
        self.claims.push(claim);
    }

    /// Generate an XMP packet.
    pub fn to_packet(&self, info: &IndexMap<String, String>, language: Option<&str>) -> String {
        let mut xml = String::new();
        xml.push_str(r#"<?xpacket begin="" id="W5M0MpCehiHzreSzNTczkc9d"?>"#);
        xml.push('\n');
        xml.push_str(&format!(r#"<x:xmpmeta xmlns:x="{}">"#, NS_X));
        xml.push('\n');
        xml.push_str(&format!(r#"  <rdf:RDF xmlns:rdf="{}">"#, NS_RDF));
        xml.push('\n');
        xml.push_str("    <rdf:Description rdf:about=\"\"\n");
        xml.push_str(&format!("        xmlns:dc=\"{}\"\n", NS_DC));
        xml.push_str(&format!("        xmlns:xmp=\"{}\"\n", NS_XMP));
        xml.push_str(&format!("        xmlns:pdf=\"{}\"\n", NS_PDF));
        xml.push_str(&format!("        xmlns:xmpMM=\"{}\"\n", NS_XMP_MM));
        xml.push_str(&format!("        xmlns:stEvt=\"{}\"\n", NS_ST_EVT));
        xml.push_str(&format!("        xmlns:pdfaid=\"{}\"\n", NS_PDFAID));
        xml.push_str(&format!("        xmlns:pdfuaid=\"{}\"\n", NS_PDFUAID));
        xml.push_str(&format!("        xmlns:pdfxid=\"{}\">\n", NS_PDFXID));

        if let Some(title) = info.get("Title") {
            push_alt(&mut xml, "dc:title", title);
        }
        if let Some(author) = info.get("Author") {
            xml.push_str("      <dc:creator>\n        <rdf:Seq>\n");
            xml.push_str(&format!("          <rdf:li>{}</rdf:li>\n", escape_xml(author)));
            xml.push_str("        </rdf:Seq>\n      </dc:creator>\n");
        }
        if let Some(subject) = info.get("Subject") {
            push_alt(&mut xml, "dc:description", subject);
        }
        if let Some(language) = language {
            xml.push_str("      <dc:language>\n        <rdf:Bag>\n");
            xml.push_str(&format!("          <rdf:li>{}</rdf:li>\n", escape_xml(language)));
            xml.push_str("        </rdf:Bag>\n      </dc:language>\n");
        }
        if let Some(tool) = info.get("Creator") {
            push_simple(&mut xml, "xmp:CreatorTool", tool);
        }
        if let Some(date) = self.create_date {
            push_simple(&mut xml, "xmp:CreateDate", &date.to_rfc3339());
        }
        if let Some(date) = self.modify_date {
            push_simple(&mut xml, "xmp:ModifyDate", &date.to_rfc3339());
        }
        if let Some(producer) = info.get("Producer") {
            push_simple(&mut xml, "pdf:Producer", producer);
        }
        if let Some(keywords) = info.get("Keywords") {
            push_simple(&mut xml, "pdf:Keywords", keywords);
        }

        for claim in &self.claims {
            match claim.family() {
                StandardFamily::PdfA => {
                    if let Some(part) = claim.pdfa_part() {
                        push_simple(&mut xml, "pdfaid:part", &part.to_string());
                    }
                    if let Some(conformance) = claim.pdfa_conformance() {
                        push_simple(&mut xml, "pdfaid:conformance", conformance);
                    }
                },
                StandardFamily::PdfUa => push_simple(&mut xml, "pdfuaid:part", "1"),
                StandardFamily::PdfX => push_simple(&mut xml, "pdfxid:GTS_PDFXVersion", claim.name()),
                StandardFamily::None => {},
            }
        }

        if !self.history.is_empty() {
            xml.push_str("      <xmpMM:History>\n        <rdf:Seq>\n");
            for entry in &self.history {
                xml.push_str("          <rdf:li rdf:parseType=\"Resource\">\n");
                xml.push_str(&format!(
                    "            <stEvt:action>{}</stEvt:action>\n",
                    escape_xml(&entry.action)
                ));
                if let Some(when) = entry.when {
                    xml.push_str(&format!("            <stEvt:when>{}</stEvt:when>\n", when.to_rfc3339()));
                }
                if let Some(agent) = &entry.software_agent {
                    xml.push_str(&format!(
                        "            <stEvt:softwareAgent>{}</stEvt:softwareAgent>\n",
                        escape_xml(agent)
                    ));
                }
                if let Some(params) = &entry.parameters {
                    xml.push_str(&format!(
                        "            <stEvt:parameters>{}</stEvt:parameters>\n",
                        escape_xml(params)
                    ));
                }
                xml.push_str("          </rdf:li>\n");
            }
            xml.push_str("        </rdf:Seq>\n      </xmpMM:History>\n");
        }

        xml.push_str("    </rdf:Description>\n");
        xml.push_str("  </rdf:RDF>\n");
        xml.push_str("</x:xmpmeta>\n");
        xml.push_str(r#"<?xpacket end="w"?>"#);
        xml
    }

    /// Parse a packet. Properties may appear as elements or as attributes
    /// of `rdf:Description`.
    pub fn parse(xml: &str) -> Result<ParsedXmp> {
        let mut parsed = ParsedXmp::default();
        parsed.metadata.present = true;

        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut element_stack: Vec<String> = Vec::new();
        let mut pdfa_part: Option<u8> = None;
        let mut pdfa_conformance: Option<String> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    if name == "rdf:li" && element_stack.iter().any(|el| el == "xmpMM:History") {
                        parsed.metadata.history.push(HistoryEntry {
                            action: String::new(),
                            when: None,
                            software_agent: None,
                            parameters: None,
                        });
                    }
                    if name == "rdf:Description" {
                        for (key, value) in attributes(&e) {
                            apply_property(&mut parsed, &key, value, &mut pdfa_part, &mut pdfa_conformance);
                        }
                    }
                    element_stack.push(name);
                },
                Ok(Event::Empty(e)) => {
                    if e.name().as_ref() == b"rdf:Description" {
                        for (key, value) in attributes(&e) {
                            apply_property(&mut parsed, &key, value, &mut pdfa_part, &mut pdfa_conformance);
                        }
                    }
                },
                Ok(Event::Text(e)) => {
                    let text = e.unescape().unwrap_or_default().trim().to_string();
                    if text.is_empty() {
                        continue;
                    }
                    let property = element_stack
                        .iter()
                        .rev()
                        .find(|el| !el.starts_with("rdf:") && !el.starts_with("x:"))
                        .cloned();
                    if let Some(prop) = property {
                        apply_property(&mut parsed, &prop, text, &mut pdfa_part, &mut pdfa_conformance);
                    }
                },
                Ok(Event::End(_)) => {
                    element_stack.pop();
                },
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::InvalidArgument(format!(
                        "XMP parse error at {}: {}",
                        reader.buffer_position(),
                        e
                    )))
                },
                _ => {},
            }
        }

        if let Some(part) = pdfa_part {
            match StandardProfile::from_pdfa(part, pdfa_conformance.as_deref()) {
                Some(claim) => parsed.metadata.set_claim(claim),
                None => log::warn!("Unrecognised PDF/A claim: part {} conformance {:?}", part, pdfa_conformance),
            }
        }
        Ok(parsed)
    }
}

fn attributes(e: &BytesStart<'_>) -> Vec<(String, String)> {
    e.attributes()
        .filter_map(|a| a.ok())
        .filter_map(|a| {
            let key = String::from_utf8_lossy(a.key.as_ref()).to_string();
            if key.starts_with("xmlns") || key.starts_with("rdf:") {
                return None;
            }
            let value = a.unescape_value().ok()?.to_string();
            Some((key, value))
        })
        .collect()
}

fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text).ok().map(|d| d.with_timezone(&Utc))
}

fn apply_property(
    parsed: &mut ParsedXmp,
    prop: &str,
    text: String,
    pdfa_part: &mut Option<u8>,
    pdfa_conformance: &mut Option<String>,
) {
    match prop {
        "dc:title" => {
            parsed.info.entry("Title".to_string()).or_insert(text);
        },
        "dc:creator" => {
            parsed.info.entry("Author".to_string()).or_insert(text);
        },
        "dc:description" => {
            parsed.info.entry("Subject".to_string()).or_insert(text);
        },
        "dc:language" => parsed.language = Some(text),
        "xmp:CreatorTool" => {
            parsed.info.insert("Creator".to_string(), text);
        },
        "pdf:Producer" => {
            parsed.info.insert("Producer".to_string(), text);
        },
        "pdf:Keywords" => {
            parsed.info.insert("Keywords".to_string(), text);
        },
        "xmp:CreateDate" => parsed.metadata.create_date = parse_date(&text),
        "xmp:ModifyDate" => parsed.metadata.modify_date = parse_date(&text),
        "pdfaid:part" => *pdfa_part = text.parse().ok(),
        "pdfaid:conformance" => *pdfa_conformance = Some(text),
        "pdfuaid:part" => {
            if text == "1" {
                parsed.metadata.set_claim(StandardProfile::PdfUa1);
            }
        },
        "pdfxid:GTS_PDFXVersion" => match text.parse::<StandardProfile>() {
            Ok(claim) if claim.family() == StandardFamily::PdfX => parsed.metadata.set_claim(claim),
            _ => log::warn!("Unrecognised PDF/X version '{}'", text),
        },
        "stEvt:action" | "stEvt:when" | "stEvt:softwareAgent" | "stEvt:parameters" => {
            if let Some(entry) = parsed.metadata.history.last_mut() {
                match prop {
                    "stEvt:action" => entry.action = text,
                    "stEvt:when" => entry.when = parse_date(&text),
                    "stEvt:softwareAgent" => entry.software_agent = Some(text),
                    _ => entry.parameters = Some(text),
                }
            }
        },
        _ => {},
    }
}

fn push_simple(xml: &mut String, name: &str, value: &str) {
    xml.push_str(&format!("      <{}>{}</{}>\n", name, escape_xml(value), name));
}

fn push_alt(xml: &mut String, name: &str, value: &str) {
    xml.push_str(&format!("      <{}>\n", name));
    xml.push_str("        <rdf:Alt>\n");
    xml.push_str(&format!(
        "          <rdf:li xml:lang=\"x-default\">{}</rdf:li>\n",
        escape_xml(value)
    ));
    xml.push_str("        </rdf:Alt>\n");
    xml.push_str(&format!("      </{}>\n", name));
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> IndexMap<String, String> {
        let mut info = IndexMap::new();
        info.insert("Title".to_string(), "Annual <Report>".to_string());
        info.insert("Author".to_string(), "J. Smith".to_string());
        info.insert("Producer".to_string(), "pdf_folio".to_string());
        info
    }

    #[test]
    fn test_packet_contains_claims_and_escaped_title() {
        let mut xmp = XmpMetadata::new();
        xmp.set_claim(StandardProfile::PdfA3a);
        xmp.set_claim(StandardProfile::PdfUa1);
        let packet = xmp.to_packet(&info(), Some("en-GB"));
        assert!(packet.contains("<pdfaid:part>3</pdfaid:part>"));
        assert!(packet.contains("<pdfaid:conformance>A</pdfaid:conformance>"));
        assert!(packet.contains("<pdfuaid:part>1</pdfuaid:part>"));
        assert!(packet.contains("Annual &lt;Report&gt;"));
    }

    #[test]
    fn test_parse_generated_packet() {
        let mut xmp = XmpMetadata::new();
        xmp.set_claim(StandardProfile::PdfA2b);
        xmp.set_claim(StandardProfile::PdfX4);
        xmp.add_history("converted", Some("to PDF/A-2b".to_string()));
        let packet = xmp.to_packet(&info(), Some("de"));

        let parsed = XmpMetadata::parse(&packet).unwrap();
        assert!(parsed.metadata.present);
        assert_eq!(parsed.info.get("Title").map(String::as_str), Some("Annual <Report>"));
        assert_eq!(parsed.info.get("Author").map(String::as_str), Some("J. Smith"));
        assert_eq!(parsed.language.as_deref(), Some("de"));
        assert!(parsed.metadata.claims.contains(&StandardProfile::PdfA2b));
        assert!(parsed.metadata.claims.contains(&StandardProfile::PdfX4));
        assert_eq!(parsed.metadata.history.len(), 1);
        assert_eq!(parsed.metadata.history[0].action, "converted");
        assert_eq!(parsed.metadata.history[0].parameters.as_deref(), Some("to PDF/A-2b"));
    }

    #[test]
    fn test_parse_attribute_form() {
        let xml = r#"<x:xmpmeta xmlns:x="adobe:ns:meta/"><rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
            <rdf:Description rdf:about="" xmlns:pdfaid="http://www.aiim.org/pdfa/ns/id/" pdfaid:part="1" pdfaid:conformance="B"/>
            </rdf:RDF></x:xmpmeta>"#;
        let parsed = XmpMetadata::parse(xml).unwrap();
        assert_eq!(parsed.metadata.claims, vec![StandardProfile::PdfA1b]);
    }

    #[test]
    fn test_one_claim_per_family() {
        let mut xmp = XmpMetadata::new();
        xmp.set_claim(StandardProfile::PdfA2a);
        xmp.set_claim(StandardProfile::PdfA2b);
        assert_eq!(xmp.claims, vec![StandardProfile::PdfA2b]);
    }

    #[test]
    fn test_malformed_packet() {
        assert!(XmpMetadata::parse("<x:xmpmeta><rdf:RDF></x:xmpmeta>").is_err());
    }
}
