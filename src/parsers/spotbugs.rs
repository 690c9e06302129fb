/// Parser for SpotBugs (and legacy FindBugs) XML reports.
///
/// Report structure (only the parts we read):
///   <BugCollection version="..." sequence="0" timestamp="..." release="">
///     <Project projectName="..."> ... </Project>
///     <BugInstance type="NP_NULL_ON_SOME_PATH" priority="2" rank="14"
///                  abbrev="NP" category="CORRECTNESS" instanceHash="...">
///       <ShortMessage>...</ShortMessage>
///       <LongMessage>...</LongMessage>
///       <Class classname="com.example.Foo" primary="true"> ... </Class>
///       <Method ...> ... </Method>
///       <SourceLine classname="..." start="10" end="12" sourcepath="com/example/Foo.java"/>
///     </BugInstance>
///     <BugCategory category="..."> ... </BugCategory>
///     <FindBugsSummary total_bugs="12" total_classes="7" priority_1="3"
///                      priority_2="5" priority_3="4" ...>
///       <PackageStats ...> ... </PackageStats>
///     </FindBugsSummary>
///   </BugCollection>
///
/// Anything else is skipped. `SourceLine` and `Class` elements are only read
/// when they are direct children of `<BugInstance>`; nested copies under
/// `<Method>` or `<Field>` describe other locations.
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use super::{attr_map, lenient_attr, numeric_attr, Parser};
use crate::error::{Result, SpotwatchError};
use crate::model::*;

pub struct SpotBugsParser;

impl Parser for SpotBugsParser {
    fn parse(&self, input: &[u8]) -> Result<BugCollection> {
        parse(input)
    }
}

/// Parse a SpotBugs XML report from raw bytes.
pub fn parse(input: &[u8]) -> Result<BugCollection> {
    let mut reader = Reader::from_reader(input);
    reader.trim_text(true);

    let mut data = BugCollection::new();
    let mut buf = Vec::new();

    // Names of the currently open elements, outermost first.
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut seen_root = false;
    let mut current_bug: Option<BugInstance> = None;

    loop {
        let position = reader.buffer_position();
        let event = reader.read_event_into(&mut buf);
        let is_start_event = matches!(&event, Ok(Event::Start(_)));
        match event {
            Err(e) => {
                return Err(SpotwatchError::Decode {
                    message: e.to_string(),
                    position: reader.buffer_position(),
                })
            }
            Ok(Event::Eof) => break,
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                let name = e.name().as_ref().to_vec();

                if !seen_root {
                    if name != b"BugCollection" {
                        return Err(SpotwatchError::Decode {
                            message: format!(
                                "expected <BugCollection> root element, found <{}>",
                                String::from_utf8_lossy(&name)
                            ),
                            position,
                        });
                    }
                    seen_root = true;
                    read_root(e, &mut data);
                } else {
                    let parent = stack.last().map(Vec::as_slice);
                    match (parent, name.as_slice()) {
                        (_, b"Project") => {
                            data.project_name = attr_map(e).get("projectName").cloned();
                        }
                        (_, b"BugInstance") => {
                            let bug = read_bug_instance(e, position)?;
                            if is_start_event {
                                current_bug = Some(bug);
                            } else {
                                data.bug_instances.push(bug);
                            }
                        }
                        (Some(b"BugInstance"), b"Class") => {
                            if let Some(bug) = current_bug.as_mut() {
                                let attrs = attr_map(e);
                                let primary = attrs.get("primary").map(|v| v == "true");
                                if bug.class_name.is_none() || primary == Some(true) {
                                    bug.class_name = attrs.get("classname").cloned();
                                }
                            }
                        }
                        (Some(b"BugInstance"), b"SourceLine") => {
                            if let Some(bug) = current_bug.as_mut() {
                                if bug.source_line.is_none() {
                                    bug.source_line = Some(read_source_line(e));
                                }
                            }
                        }
                        (_, b"FindBugsSummary") => {
                            data.summary = Some(read_summary(e, position)?);
                        }
                        _ => {}
                    }
                }

                if is_start_event {
                    stack.push(name);
                }
            }
            Ok(Event::Text(ref e)) => {
                if let Some(slot) = message_slot(&stack, current_bug.as_mut()) {
                    let text = e.unescape().map_err(|err| SpotwatchError::Decode {
                        message: err.to_string(),
                        position: reader.buffer_position(),
                    })?;
                    append_text(slot, &text);
                }
            }
            Ok(Event::CData(ref e)) => {
                if let Some(slot) = message_slot(&stack, current_bug.as_mut()) {
                    append_text(slot, &String::from_utf8_lossy(e));
                }
            }
            Ok(Event::End(ref e)) => {
                if e.name().as_ref() == b"BugInstance" {
                    if let Some(bug) = current_bug.take() {
                        data.bug_instances.push(bug);
                    }
                }
                stack.pop();
            }
            _ => {}
        }
        buf.clear();
    }

    if !seen_root {
        return Err(SpotwatchError::Decode {
            message: "document has no <BugCollection> element".to_string(),
            position: reader.buffer_position(),
        });
    }
    if !stack.is_empty() {
        return Err(SpotwatchError::Decode {
            message: format!(
                "unexpected end of document inside <{}>",
                String::from_utf8_lossy(stack.last().map(Vec::as_slice).unwrap_or_default())
            ),
            position: reader.buffer_position(),
        });
    }

    Ok(data)
}

fn read_root(e: &BytesStart, data: &mut BugCollection) {
    let attrs = attr_map(e);
    data.version = attrs.get("version").cloned();
    data.release = attrs.get("release").cloned().filter(|r| !r.is_empty());
    data.timestamp = attrs.get("timestamp").cloned();
    data.sequence = lenient_attr(&attrs, "sequence");
}

/// The message field that text at the top of `stack` belongs to, if any.
fn message_slot<'a>(
    stack: &[Vec<u8>],
    bug: Option<&'a mut BugInstance>,
) -> Option<&'a mut Option<String>> {
    if stack.len() < 2 || stack[stack.len() - 2] != b"BugInstance" {
        return None;
    }
    let bug = bug?;
    match stack.last().map(Vec::as_slice) {
        Some(b"ShortMessage") => Some(&mut bug.short_message),
        Some(b"LongMessage") => Some(&mut bug.long_message),
        _ => None,
    }
}

/// Text and CDATA sections of one element are concatenated.
fn append_text(slot: &mut Option<String>, text: &str) {
    match slot {
        Some(existing) => existing.push_str(text),
        None => *slot = Some(text.to_string()),
    }
}

fn read_bug_instance(e: &BytesStart, position: usize) -> Result<BugInstance> {
    let attrs = attr_map(e);
    Ok(BugInstance {
        category: attrs.get("category").cloned().unwrap_or_default(),
        priority: numeric_attr(&attrs, "priority", position)?.unwrap_or(0),
        bug_type: attrs.get("type").cloned(),
        abbrev: attrs.get("abbrev").cloned(),
        rank: lenient_attr(&attrs, "rank"),
        instance_hash: attrs.get("instanceHash").cloned(),
        ..Default::default()
    })
}

fn read_source_line(e: &BytesStart) -> SourceLine {
    let attrs = attr_map(e);
    SourceLine {
        source_path: attrs.get("sourcepath").cloned(),
        start: lenient_attr(&attrs, "start"),
        end: lenient_attr(&attrs, "end"),
    }
}

fn read_summary(e: &BytesStart, position: usize) -> Result<FindBugsSummary> {
    let attrs = attr_map(e);
    let count = |name: &str| -> Result<u64> {
        Ok(numeric_attr(&attrs, name, position)?.unwrap_or(0))
    };
    Ok(FindBugsSummary {
        total_bugs: count("total_bugs")?,
        total_classes: count("total_classes")?,
        priority_1: count("priority_1")?,
        priority_2: count("priority_2")?,
        priority_3: count("priority_3")?,
        priority_4: count("priority_4")?,
        priority_5: count("priority_5")?,
        num_packages: count("num_packages")?,
        total_size: count("total_size")?,
        referenced_classes: count("referenced_classes")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_spotbugs() {
        let input = include_bytes!("../../tests/fixtures/spotbugsXml.xml");
        let data = SpotBugsParser.parse(input).unwrap();

        assert_eq!(data.version.as_deref(), Some("4.7.3"));
        assert_eq!(data.project_name.as_deref(), Some("demo-service"));
        assert_eq!(data.bug_instances.len(), 4);

        let first = &data.bug_instances[0];
        assert_eq!(first.category, "CORRECTNESS");
        assert_eq!(first.priority, 1);
        assert_eq!(first.bug_type.as_deref(), Some("NP_NULL_ON_SOME_PATH"));
        assert_eq!(first.rank, Some(6));
        assert_eq!(
            first.short_message.as_deref(),
            Some("Possible null pointer dereference")
        );
        assert_eq!(first.class_name.as_deref(), Some("com.example.Service"));

        // The method-level SourceLine must not shadow the instance-level one.
        let line = first.source_line.as_ref().unwrap();
        assert_eq!(line.source_path.as_deref(), Some("com/example/Service.java"));
        assert_eq!(line.start, Some(42));
        assert_eq!(line.end, Some(42));

        let summary = data.summary.unwrap();
        assert_eq!(summary.total_bugs, 4);
        assert_eq!(summary.total_classes, 9);
        assert_eq!(summary.priority_1, 1);
        assert_eq!(summary.priority_2, 2);
        assert_eq!(summary.priority_3, 1);
        assert_eq!(summary.priority_5, 0);
    }

    #[test]
    fn self_closing_instances_and_unknown_elements() {
        let input = br#"<?xml version="1.0"?>
<BugCollection version="4.8.0">
  <Errors errors="0" missingClasses="0"/>
  <BugInstance category="STYLE" priority="3"/>
  <Surprise answer="42"><Nested/></Surprise>
  <BugInstance category="STYLE" priority="4" unknownAttr="x"/>
</BugCollection>"#;
        let data = parse(input).unwrap();
        assert_eq!(data.bug_instances.len(), 2);
        assert_eq!(data.bug_instances[1].priority, 4);
        assert!(data.summary.is_none());
    }

    #[test]
    fn wrong_root_is_rejected() {
        let err = parse(b"<coverage line-rate=\"1\"></coverage>").unwrap_err();
        assert!(matches!(err, SpotwatchError::Decode { .. }), "{err}");
    }

    #[test]
    fn truncated_document_is_rejected() {
        let err = parse(b"<BugCollection><BugInstance category=\"A\" priority=\"1\">")
            .unwrap_err();
        assert!(matches!(err, SpotwatchError::Decode { .. }), "{err}");
    }

    #[test]
    fn non_numeric_priority_is_rejected() {
        let err = parse(b"<BugCollection><BugInstance category=\"A\" priority=\"high\"/></BugCollection>")
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("priority"), "{msg}");
    }

    #[test]
    fn out_of_range_priorities_and_bad_descriptive_attributes_are_kept() {
        let input = br#"<BugCollection sequence="latest">
  <BugInstance category="BAD_PRACTICE" priority="-1" rank="n/a"/>
  <BugInstance category="BAD_PRACTICE" priority="8589934592" rank="12">
    <SourceLine sourcepath="A.java" start="?" end="7"/>
  </BugInstance>
</BugCollection>"#;
        let data = parse(input).unwrap();
        assert_eq!(data.sequence, None);
        assert_eq!(data.bug_instances.len(), 2);
        assert_eq!(data.bug_instances[0].priority, -1);
        assert_eq!(data.bug_instances[0].rank, None);
        assert_eq!(data.bug_instances[1].priority, 8_589_934_592);
        assert_eq!(data.bug_instances[1].rank, Some(12));
        let line = data.bug_instances[1].source_line.as_ref().unwrap();
        assert_eq!(line.start, None);
        assert_eq!(line.end, Some(7));
    }

    #[test]
    fn cdata_messages_are_captured() {
        let input = br#"<BugCollection>
  <BugInstance category="STYLE" priority="2">
    <ShortMessage><![CDATA[Comparison a < b is always true]]></ShortMessage>
    <LongMessage><![CDATA[Uses x & y]]></LongMessage>
  </BugInstance>
</BugCollection>"#;
        let data = parse(input).unwrap();
        let bug = &data.bug_instances[0];
        assert_eq!(
            bug.short_message.as_deref(),
            Some("Comparison a < b is always true")
        );
        assert_eq!(bug.long_message.as_deref(), Some("Uses x & y"));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(parse(b"").is_err());
    }
}
