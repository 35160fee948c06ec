use siem_rag_core::classify::{
    extract_events, extract_events_from_path, KeywordClassifier, KeywordRule, MalwareType,
};
use siem_rag_core::vector::{CollectionSchema, VectorRecord};

#[test]
fn lines_without_trigger_keywords_are_ignored() {
    let c = KeywordClassifier::default();
    assert!(c.classify("INFO: user login successful from 10.0.0.5").is_none());
    assert!(c.classify("").is_none());
}

#[test]
fn first_matching_rule_wins() {
    let c = KeywordClassifier::default();
    let cases = [
        ("Ransom note dropped after beacon", MalwareType::Ransomware),
        ("files ENCRYPTED by unknown process", MalwareType::Ransomware),
        ("c2 beacon via powershell", MalwareType::C2Communication),
        ("PowerShell payload staged", MalwareType::Dropper),
        ("mimikatz sekurlsa::logonpasswords", MalwareType::CredentialTheft),
        ("trojan signature matched", MalwareType::Unknown),
        ("suspicious process tree", MalwareType::Unknown),
    ];
    for (line, want) in cases {
        let ev = c.classify(line).unwrap();
        assert_eq!(ev.malware_type, want, "{}", line);
    }
}

#[test]
fn events_have_fresh_ids_and_bounded_text() {
    let line = format!("malware {}", "ü".repeat(5000));
    let c = KeywordClassifier::default();
    let a = c.classify(&line).unwrap();
    let b = c.classify(&line).unwrap();
    assert_ne!(a.incident_id, b.incident_id);
    assert!(a.incident_id.starts_with("inc-"));
    assert_eq!(a.incident_id.len(), 16);
    assert!(a.summary.len() <= 1024);
    assert!(a.raw.len() <= 4096);
    assert!(a.summary.ends_with('ü'));
}

#[test]
fn multibyte_events_are_accepted_by_the_store_schema() {
    let line = format!("malware {}", "ü".repeat(5000));
    let ev = KeywordClassifier::default().classify(&line).unwrap();
    let schema = CollectionSchema::malware_incidents("malware_incidents", 4);
    let rec = VectorRecord::from_malware_event(&ev, vec![0.0; 4]);
    assert!(rec.normalized_fields(&schema).is_ok());

    let wide = CollectionSchema::malware_incidents_wide("soc_incidents", 4);
    let ev = KeywordClassifier::default().fitted_to(&wide).classify(&line).unwrap();
    assert_eq!(ev.raw.len(), line.len().min(8192));
    let rec = VectorRecord::from_malware_event(&ev, vec![0.0; 4]);
    assert!(rec.normalized_fields(&wide).is_ok());
}

#[test]
fn replacement_rule_table_is_honoured() {
    let c = KeywordClassifier::with_rules(
        vec!["lateral"],
        vec![KeywordRule::new(MalwareType::CredentialTheft, &["lateral"])],
    );
    assert_eq!(
        c.classify("lateral movement via psexec").unwrap().malware_type,
        MalwareType::CredentialTheft
    );
    assert!(c.classify("ransomware").is_none());
}

#[test]
fn extraction_keeps_input_order_and_skips_blank_lines() {
    let logs = "\n  Suspicious powershell on WIN-01  \n\nINFO: ok\nC2 beacon to 198.51.100.2\n";
    let events = extract_events(logs);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].summary, "Suspicious powershell on WIN-01");
    assert_eq!(events[1].malware_type, MalwareType::C2Communication);
}

#[test]
fn extraction_reads_log_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("host.log");
    std::fs::write(&path, "Mimikatz dump attempt on DC-01\nheartbeat\n").unwrap();
    let events = extract_events_from_path(&path).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].malware_type.as_str(), "credential_theft");
    assert!(extract_events_from_path(dir.path().join("missing.log")).is_err());
}
