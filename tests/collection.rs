use kira_gene_prioritizer::association::{GeneDiseaseAssociation, simplify_evidence};
use kira_gene_prioritizer::collection::GeneDiseaseCollection;
use kira_gene_prioritizer::domain::{Disease, Gene, Source, SourceLevel};

fn gene(id: &str) -> Gene {
    id.parse().unwrap()
}

fn disease(id: &str) -> Disease {
    id.parse().unwrap()
}

fn gda(gene_id: &str, disease_id: &str) -> GeneDiseaseAssociation {
    GeneDiseaseAssociation::new(gene(gene_id), disease(disease_id))
}

fn source(id: &str) -> Source {
    Source::from_uri(
        &format!("http://rdf.disgenet.org/v6.0.0/void/{id}"),
        id,
        SourceLevel::Curated,
    )
    .unwrap()
}

fn pairs(collection: &GeneDiseaseCollection) -> Vec<(String, String)> {
    collection
        .all_ordered()
        .into_iter()
        .map(|gda| (gda.gene().id().to_string(), gda.disease().id().to_string()))
        .collect()
}

#[test]
fn ordering_ignores_insertion_order() {
    let input = [
        ("ncbigene:56172", "umls:C0265292"),
        ("ncbigene:29123", "umls:C1835764"),
        ("ncbigene:479", "umls:C0265292"),
        ("ncbigene:29123", "umls:C0220687"),
    ];
    let forward: GeneDiseaseCollection = input.iter().map(|(g, d)| gda(g, d)).collect();
    let backward: GeneDiseaseCollection = input.iter().rev().map(|(g, d)| gda(g, d)).collect();

    assert_eq!(pairs(&forward), pairs(&backward));
    assert_eq!(
        pairs(&forward),
        vec![
            ("479".to_string(), "C0265292".to_string()),
            ("29123".to_string(), "C0220687".to_string()),
            ("29123".to_string(), "C1835764".to_string()),
            ("56172".to_string(), "C0265292".to_string()),
        ]
    );
}

#[test]
fn lookup_then_record_accumulates() {
    let befree = source("BEFREE");
    let mut collection = GeneDiseaseCollection::new();
    collection.insert(gda("ncbigene:286", "umls:C0265292"));

    for evidence in [
        "http://identifiers.org/pubmed/16462526",
        "http://identifiers.org/pubmed/19257826",
    ] {
        let pair = gda("ncbigene:286", "umls:C0265292");
        assert!(!collection.insert(pair.clone()));
        collection
            .get_mut(pair.gene(), pair.disease())
            .unwrap()
            .record_with_evidence(&befree, evidence);
    }

    let stored = collection.lookup(&gda("ncbigene:286", "umls:C0265292")).unwrap();
    assert_eq!(collection.len(), 1);
    assert_eq!(stored.count_for_source(&befree), 2);
    assert_eq!(
        stored.all_evidence_simplified_ordered(),
        vec!["16462526", "19257826"]
    );
}

#[test]
fn both_indexes_follow_removal() {
    let mut collection = GeneDiseaseCollection::from_pairs([
        gda("ncbigene:29123", "umls:C0220687"),
        gda("ncbigene:29123", "umls:C1835764"),
        gda("ncbigene:2697", "umls:C0265292"),
    ]);
    let ankrd11 = gene("ncbigene:29123");
    let kbg = disease("umls:C0220687");

    assert_eq!(collection.by_left(&ankrd11).count(), 2);
    assert!(collection.remove(&gda("ncbigene:29123", "umls:C0220687")));
    assert_eq!(collection.by_left(&ankrd11).count(), 1);
    assert_eq!(collection.by_right(&kbg).count(), 0);
    assert!(!collection.diseases().any(|d| *d == kbg));

    assert!(collection.take(&gene("ncbigene:2697"), &disease("umls:C0265292")).is_some());
    assert_eq!(collection.genes().count(), 1);
    assert_eq!(collection.rights_ordered(), vec![&disease("umls:C1835764")]);
}

#[test]
fn merge_folds_independent_collections() {
    let clinvar = source("CLINVAR");
    let uniprot = source("UNIPROT");

    let mut left = GeneDiseaseAssociation::new(gene("ncbigene:29123"), disease("umls:C0220687"));
    left.record_with_evidence(&clinvar, "http://identifiers.org/pubmed/21782149");
    let mut right =
        GeneDiseaseAssociation::with_score(gene("ncbigene:29123"), disease("umls:C0220687"), 0.8);
    right.record_with_evidence(&clinvar, "http://identifiers.org/pubmed/25125236");
    right.record(&uniprot);

    let mut merged = GeneDiseaseCollection::from_pairs([left]);
    merged.merge(GeneDiseaseCollection::from_pairs([
        right,
        gda("ncbigene:479", "umls:C0265292"),
    ]));

    assert_eq!(merged.len(), 2);
    let gda = merged
        .get(&gene("ncbigene:29123"), &disease("umls:C0220687"))
        .unwrap();
    assert_eq!(gda.score(), Some(0.8));
    assert_eq!(gda.count_for_source(&clinvar), 2);
    assert_eq!(gda.count_for_source(&uniprot), 1);
    assert_eq!(gda.evidence_for_source(&clinvar).unwrap().len(), 2);
    assert!(gda.evidence_for_source(&uniprot).is_none());
}

#[test]
fn simplified_evidence_is_deduplicated() {
    let mut gda = gda("ncbigene:1", "umls:C1");
    gda.record_with_evidence(&source("BEFREE"), "http://identifiers.org/pubmed/7");
    gda.record_with_evidence(&source("CLINVAR"), "7");
    gda.record_with_evidence(&source("CLINVAR"), "http://example.org/doc/1");

    assert_eq!(gda.all_evidence().len(), 3);
    assert_eq!(
        gda.all_evidence_simplified_ordered(),
        vec!["7", "http://example.org/doc/1"]
    );
    assert_eq!(simplify_evidence("http://identifiers.org/pubmed/"), "");
}
