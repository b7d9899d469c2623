//! End-to-end scenarios over encode/decode and the query engine.

use shakmaty::variant::VariantPosition;

use openbook_core::codec::{decode_move, encode_move};
use openbook_core::model::{Entry, GameRef, LichessPack, RecordPack, SpeedBucket, Winner};
use openbook_core::query::{children, position_hash, probe_entry, QueryFilter};
use openbook_core::store::{LichessStore, StoreConfig};
use openbook_core::{RatingBand, Variant};

fn game(id: &str, winner: Winner, speed: SpeedBucket, rating: u16) -> GameRef {
    GameRef {
        id: id.parse().unwrap(),
        winner,
        speed,
        rating,
    }
}

fn reload(entry: &Entry) -> Entry {
    LichessPack::unpack(&LichessPack::pack_to_vec(entry)).unwrap()
}

const G1F3: u16 = 21 << 6 | 6;

#[test]
fn single_game_recency_and_top() {
    let mut entry = Entry::default();
    entry.insert_ref(
        game("ref00000", Winner::White, SpeedBucket::Bullet, 1999),
        G1F3,
    );

    let entry = reload(&entry);
    let result = probe_entry(
        &entry,
        &QueryFilter {
            top_games: 4,
            recent_games: 4,
            ..QueryFilter::default()
        },
    );

    assert_eq!(result.stats.white, 1);
    assert_eq!(result.stats.draws, 0);
    assert_eq!(result.stats.black, 0);
    assert_eq!(result.stats.average_rating(), Some(1999));

    assert_eq!(result.moves.len(), 1);
    assert_eq!(result.moves[0].token, G1F3);
    let uci = decode_move(result.moves[0].token).unwrap();
    assert_eq!(uci.to_string(), "g1f3");

    assert_eq!(result.recent_games.len(), 1);
    assert_eq!(result.top_games.len(), 1);
    assert_eq!(result.recent_games[0].id.to_string(), "ref00000");
    assert_eq!(result.top_games[0], result.recent_games[0]);
}

#[test]
fn chronological_order_newest_first() {
    let mut entry = Entry::default();
    for (id, rating) in [("g0000001", 2620), ("g0000002", 2610), ("g0000003", 2650)] {
        entry.insert_ref(
            game(id, Winner::Draw, SpeedBucket::Classical, rating),
            G1F3,
        );
    }

    let entry = reload(&entry);
    let result = probe_entry(
        &entry,
        &QueryFilter {
            recent_games: 10,
            ..QueryFilter::default()
        },
    );

    // Newest first, truncated to the two persisted per cell; the oldest
    // game survives only in the counters and the top-games selection.
    let ids: Vec<String> = result
        .recent_games
        .iter()
        .map(|g| g.id.to_string())
        .collect();
    assert_eq!(ids, ["g0000003", "g0000002"]);
    assert_eq!(result.stats.total(), 3);
    assert!(result
        .top_games
        .iter()
        .any(|g| g.id.to_string() == "g0000001"));
}

#[test]
fn top_selection_is_per_requested_speed() {
    let mut entry = Entry::default();
    for (i, rating) in (2501..=2509).enumerate() {
        entry.insert_ref(
            game(
                &format!("c000000{}", i + 1),
                Winner::Draw,
                SpeedBucket::Classical,
                rating,
            ),
            G1F3,
        );
    }
    entry.insert_ref(
        game("abcdefgh", Winner::White, SpeedBucket::Classical, 2871),
        G1F3,
    );
    for (i, rating) in (2777..=2785).enumerate() {
        entry.insert_ref(
            game(
                &format!("b000000{}", i + 1),
                Winner::Black,
                SpeedBucket::Bullet,
                rating,
            ),
            G1F3,
        );
    }

    let entry = reload(&entry);
    let result = probe_entry(
        &entry,
        &QueryFilter {
            speeds: vec![SpeedBucket::Classical],
            ..QueryFilter::default()
        },
    );

    // Bullet games rate higher, but top selection only looks at the
    // requested speed slice.
    assert!(result
        .top_games
        .iter()
        .any(|g| g.id.to_string() == "abcdefgh"));
    assert!(result
        .top_games
        .iter()
        .all(|g| g.speed == SpeedBucket::Classical));
    assert_eq!(result.stats.total(), 10);
}

#[test]
fn rating_band_filter_narrows_totals() {
    let mut entry = Entry::default();
    entry.insert_ref(game("00000001", Winner::White, SpeedBucket::Blitz, 1100), 1);
    entry.insert_ref(game("00000002", Winner::Black, SpeedBucket::Blitz, 1900), 1);
    entry.insert_ref(game("00000003", Winner::Draw, SpeedBucket::Blitz, 2500), 1);

    let entry = reload(&entry);
    let result = probe_entry(
        &entry,
        &QueryFilter {
            bands: vec![RatingBand::B1800],
            ..QueryFilter::default()
        },
    );
    assert_eq!(result.stats.total(), 1);
    assert_eq!(result.stats.black, 1);
}

#[test]
fn children_probe_one_move_deep() {
    let dir = tempfile::tempdir().unwrap();
    let store = LichessStore::open(dir.path().join("standard"), &StoreConfig::default()).unwrap();

    // Index one game: 1. Nf3 d5 touches the start position and the
    // position after Nf3.
    let start = VariantPosition::new(Variant::Standard.rules());
    let g = game("aaaaaaaa", Winner::White, SpeedBucket::Blitz, 1600);

    let mut pos = start.clone();
    use shakmaty::{san::San, uci::UciMove, Position};
    for san in ["Nf3", "d5"] {
        let hash = position_hash(&pos);
        let m = san.parse::<San>().unwrap().to_move(&pos).unwrap();
        let token = encode_move(&UciMove::from_chess960(&m)).unwrap();
        store.merge(hash, g, token).unwrap();
        pos.play_unchecked(&m);
    }

    let rows = children(&start, &store, &QueryFilter::default()).unwrap();
    assert_eq!(rows.len(), 20);
    let nf3 = rows
        .iter()
        .find(|(token, _)| *token == G1F3)
        .expect("Nf3 enumerated");
    // The position after Nf3 has one recorded continuation.
    assert_eq!(nf3.1.total(), 1);
    assert!(rows
        .iter()
        .filter(|(token, _)| *token != G1F3)
        .all(|(_, stats)| stats.is_empty()));
}
