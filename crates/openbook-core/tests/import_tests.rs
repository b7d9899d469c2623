use std::sync::Arc;

use rustc_hash::FxHashMap;
use shakmaty::variant::VariantPosition;

use openbook_core::import::{LichessImporter, MasterImporter, DEFAULT_MASTER_PLIES};
use openbook_core::query::{position_hash, probe_entry, probe_master, QueryFilter};
use openbook_core::store::{BlobStore, MasterStore, StoreConfig, VariantStores};
use openbook_core::{ImportError, Variant};

fn master_pgn(white_elo: u16, black_elo: u16, site_id: &str) -> String {
    format!(
        "[Event \"Test\"]\n\
         [Site \"https://lichess.org/{site_id}\"]\n\
         [White \"White Player\"]\n\
         [Black \"Black Player\"]\n\
         [Result \"1-0\"]\n\
         [WhiteElo \"{white_elo}\"]\n\
         [BlackElo \"{black_elo}\"]\n\
         [TimeControl \"5400+30\"]\n\
         [Date \"2019.08.11\"]\n\
         \n\
         1. Nf3 d5 2. g3 1-0\n"
    )
}

fn master_importer(dir: &std::path::Path) -> (MasterImporter, Arc<MasterStore>, Arc<BlobStore>) {
    let config = StoreConfig::default();
    let store = Arc::new(MasterStore::open(dir.join("master"), &config).unwrap());
    let pgn = Arc::new(BlobStore::open(dir.join("master-pgn"), &config).unwrap());
    (
        MasterImporter::new(Arc::clone(&store), Arc::clone(&pgn), DEFAULT_MASTER_PLIES),
        store,
        pgn,
    )
}

fn lichess_importer(dir: &std::path::Path) -> (LichessImporter, Arc<VariantStores>, Arc<BlobStore>) {
    let config = StoreConfig::default();
    let stores = Arc::new(VariantStores::open(dir.join("lichess"), &config).unwrap());
    let info = Arc::new(BlobStore::open(dir.join("game-info"), &config).unwrap());
    (
        LichessImporter::new(Arc::clone(&stores), Arc::clone(&info), FxHashMap::default()),
        stores,
        info,
    )
}

fn start_hash(variant: Variant) -> u128 {
    position_hash(&VariantPosition::new(variant.rules()))
}

#[test]
fn master_import_indexes_every_ply() {
    let dir = tempfile::tempdir().unwrap();
    let (importer, store, pgn) = master_importer(dir.path());

    let id = importer.import(&master_pgn(2850, 2800, "abcdefgh")).unwrap();
    assert_eq!(id.to_string(), "abcdefgh");
    assert!(pgn.contains("abcdefgh").unwrap());

    // Three plies, three distinct positions.
    assert_eq!(store.record_count(), 3);
    let start = store.get(start_hash(Variant::Standard)).unwrap().unwrap();
    let result = probe_master(&start, 4, 12);
    assert_eq!(result.stats.white, 1);
    assert_eq!(result.stats.average_rating(), Some(2825));
    assert_eq!(result.moves.len(), 1);
    assert_eq!(result.top_games.len(), 1);
    assert_eq!(result.top_games[0].id, id);
}

#[test]
fn master_rejects_low_rating_and_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let (importer, store, _pgn) = master_importer(dir.path());

    // Average 2100: below the threshold, database unchanged.
    let err = importer.import(&master_pgn(2150, 2050, "lowrated")).unwrap_err();
    assert!(err.is_reject());
    assert!(err.to_string().contains("rejected"));
    assert_eq!(store.record_count(), 0);

    importer.import(&master_pgn(2850, 2800, "abcdefgh")).unwrap();
    let err = importer.import(&master_pgn(2850, 2800, "abcdefgh")).unwrap_err();
    assert!(err.is_reject());
    assert_eq!(store.record_count(), 3);
}

#[test]
fn master_rejects_non_standard_start() {
    let dir = tempfile::tempdir().unwrap();
    let (importer, store, _pgn) = master_importer(dir.path());

    let pgn = "[Event \"Test\"]\n\
               [Result \"1-0\"]\n\
               [WhiteElo \"2400\"]\n\
               [BlackElo \"2400\"]\n\
               [FEN \"4k3/8/8/8/8/8/8/4K2R w K - 0 1\"]\n\
               \n\
               1. Rh8+ 1-0\n";
    let err = importer.import(pgn).unwrap_err();
    assert!(err.is_reject());
    assert!(err.to_string().contains("initial position"));
    assert_eq!(store.record_count(), 0);

    let pgn = "[Event \"Test\"]\n\
               [Variant \"Atomic\"]\n\
               [Result \"1-0\"]\n\
               [WhiteElo \"2400\"]\n\
               [BlackElo \"2400\"]\n\
               \n\
               1. e4 e5 1-0\n";
    let err = importer.import(pgn).unwrap_err();
    assert!(err.is_reject());
    assert!(err.to_string().contains("standard chess"));
    assert_eq!(store.record_count(), 0);
}

#[test]
fn master_delete_subtracts_the_game() {
    let dir = tempfile::tempdir().unwrap();
    let (importer, store, pgn) = master_importer(dir.path());

    let id = importer.import(&master_pgn(2850, 2800, "abcdefgh")).unwrap();
    importer.import(&master_pgn(2400, 2400, "second00")).unwrap();
    assert_eq!(store.record_count(), 3);

    assert!(importer.delete(id).unwrap());
    assert!(!pgn.contains("abcdefgh").unwrap());
    // Shared positions keep the remaining game, counters decremented.
    let start = store.get(start_hash(Variant::Standard)).unwrap().unwrap();
    assert_eq!(start.total_games(), 1);

    assert!(!importer.delete("notagame".parse().unwrap()).unwrap());
}

#[test]
fn lichess_batch_roundtrip_with_dedup() {
    let dir = tempfile::tempdir().unwrap();
    let (importer, stores, info) = lichess_importer(dir.path());

    let game = |id: &str, tc: &str| {
        format!(
            "[Site \"https://lichess.org/{id}\"]\n\
             [White \"alpha\"]\n\
             [Black \"beta\"]\n\
             [Result \"0-1\"]\n\
             [WhiteElo \"1812\"]\n\
             [BlackElo \"1850\"]\n\
             [UTCDate \"2021.05.01\"]\n\
             [TimeControl \"{tc}\"]\n\
             \n\
             1. e4 e5 0-1\n"
        )
    };
    let batch = format!("{}\n{}", game("aaaaaaaa", "60+1"), game("bbbbbbbb", "300+3"));

    let outcome = importer.import_batch(&batch).unwrap();
    assert_eq!(outcome.indexed.len(), 2);
    assert!(outcome.rejected.is_empty());
    assert_eq!(info.get("aaaaaaaa").unwrap().as_deref(), Some("alpha|1812|beta|1850|2021"));

    // Re-importing the same batch rejects both as duplicates.
    let outcome = importer.import_batch(&batch).unwrap();
    assert!(outcome.indexed.is_empty());
    assert_eq!(outcome.rejected.len(), 2);

    let store = stores.get(Variant::Standard);
    assert_eq!(store.record_count(), 2);
    let entry = store.get(start_hash(Variant::Standard)).unwrap().unwrap();
    let result = probe_entry(&entry, &QueryFilter::default());
    assert_eq!(result.stats.black, 2);
    assert_eq!(result.stats.total(), 2);
    // One bullet game, one blitz game.
    assert_eq!(entry.cells().len(), 2);
}

#[test]
fn lichess_variant_tag_routes_to_its_store() {
    let dir = tempfile::tempdir().unwrap();
    let (importer, stores, _info) = lichess_importer(dir.path());

    let pgn = "[Site \"https://lichess.org/zhzhzhzh\"]\n\
               [Variant \"Crazyhouse\"]\n\
               [Result \"1-0\"]\n\
               [WhiteElo \"2100\"]\n\
               [BlackElo \"2000\"]\n\
               [TimeControl \"180+0\"]\n\
               \n\
               1. e4 e5 1-0\n";
    let outcome = importer.import_batch(pgn).unwrap();
    assert_eq!(outcome.indexed.len(), 1);

    assert_eq!(stores.get(Variant::Crazyhouse).record_count(), 2);
    assert_eq!(stores.get(Variant::Standard).record_count(), 0);
}

#[test]
fn lichess_rejects_unparsable_games_and_continues() {
    let dir = tempfile::tempdir().unwrap();
    let (importer, stores, _info) = lichess_importer(dir.path());

    let bad = "[Site \"https://lichess.org/cccccccc\"]\n\
               [Result \"1-0\"]\n\
               [WhiteElo \"1700\"]\n\
               [BlackElo \"1700\"]\n\
               \n\
               1. e5 1-0\n";
    let good = "[Site \"https://lichess.org/dddddddd\"]\n\
                [Result \"1/2-1/2\"]\n\
                [WhiteElo \"1700\"]\n\
                [BlackElo \"1700\"]\n\
                [TimeControl \"600+0\"]\n\
                \n\
                1. d4 d5 1/2-1/2\n";
    let outcome = importer
        .import_batch(&format!("{bad}\n{good}"))
        .unwrap();
    assert_eq!(outcome.indexed.len(), 1);
    assert_eq!(outcome.rejected.len(), 1);
    assert!(outcome.rejected[0].contains("illegal move"));
    assert_eq!(stores.get(Variant::Standard).record_count(), 2);
}

#[test]
fn lichess_missing_rating_rejects() {
    let dir = tempfile::tempdir().unwrap();
    let (importer, stores, _info) = lichess_importer(dir.path());

    let pgn = "[Site \"https://lichess.org/eeeeeeee\"]\n\
               [Result \"1-0\"]\n\
               [TimeControl \"60+0\"]\n\
               \n\
               1. e4 1-0\n";
    let outcome = importer.import_batch(pgn).unwrap();
    assert!(outcome.indexed.is_empty());
    assert_eq!(outcome.rejected.len(), 1);
    assert_eq!(stores.get(Variant::Standard).record_count(), 0);

    // A batch-level parse failure is an error, not a rejection.
    assert!(matches!(
        importer.import_batch("\u{0}\u{0}").map(|_| ()),
        Ok(()) | Err(ImportError::Read(_))
    ));
}
