//! File-backed persistence across store instances.

use dbc_core::{ContractDescriptor, Reaction, ResolvedPolicy, StructureMetadata};
use dbc_storage::{
    decode_artifact, encode_artifact, fingerprint_definition, fingerprint_policy, ArtifactStore,
    CacheCorruptionError, CacheKey, SqliteArtifactStore,
};

fn key() -> CacheKey {
    let meta = StructureMetadata::new("Ledger");
    let descriptor = ContractDescriptor::new(meta.id.clone());
    CacheKey {
        structure_id: meta.id.clone(),
        definition: fingerprint_definition(&meta, &descriptor).unwrap(),
        policy: fingerprint_policy(&ResolvedPolicy::disabled(Reaction::Logging)).unwrap(),
    }
}

#[test]
fn artifacts_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("artifacts.db");
    let path = path.to_str().unwrap();

    let payload = encode_artifact(&vec!["plan", "body"]).unwrap();
    {
        let store = SqliteArtifactStore::new(path).unwrap();
        store.save(&key(), &payload).unwrap();
    }

    let store = SqliteArtifactStore::new(path).unwrap();
    let loaded = store.load(&key()).unwrap().unwrap();
    let decoded: Vec<String> = decode_artifact(&key(), &loaded).unwrap();
    assert_eq!(decoded, vec!["plan".to_string(), "body".to_string()]);
    assert_eq!(store.keys().unwrap(), vec![key()]);
}

#[test]
fn undecodable_payload_reports_corruption() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("artifacts.db");
    let store = SqliteArtifactStore::new(path.to_str().unwrap()).unwrap();
    store.save(&key(), "{ truncated").unwrap();

    let loaded = store.load(&key()).unwrap().unwrap();
    let err = decode_artifact::<Vec<String>>(&key(), &loaded).unwrap_err();
    assert!(matches!(err, CacheCorruptionError::Decode { ref key, .. } if key.structure_id.as_str() == "Ledger"));
}
