// tests/map_tests.rs

use macroquad_tile_editor::{GridCoord, LayerId, TileMap, TilesetKind};

fn c(x: i32, y: i32) -> GridCoord {
    GridCoord::new(x, y)
}

#[test]
fn history_index_counts_place_and_erase_on_unlocked_layers() {
    let mut map = TileMap::new();
    let foreground = LayerId::from("2");
    // (paint, x, y, lock before the edit)
    let ops: [(bool, i32, i32, bool); 9] = [
        (true, 0, 0, false),
        (true, 0, 0, false), // same tile again
        (false, 5, 5, false), // empty cell
        (true, 1, 0, true),
        (false, 0, 0, false),
        (false, 0, 0, false),
        (true, -3, -7, false),
        (false, 1, 0, true),
        (true, 2, 2, false),
    ];
    let mut successes = 0;
    for (paint, x, y, lock) in ops {
        let locked = map.layers().get(&foreground).unwrap().locked;
        if lock != locked {
            map.toggle_layer_lock(&foreground).unwrap();
        }
        let changed = if paint {
            map.place_tile(c(x, y), "gem_blue")
        } else {
            map.erase_tile(c(x, y))
        };
        assert_eq!(changed, !lock);
        if changed {
            successes += 1;
        }
        assert_eq!(map.history_index(), successes);
        assert_eq!(map.history_len(), map.history_index() + 1);
    }
    assert_eq!(successes, 7);
}

#[test]
fn mutation_after_undo_drops_the_future() {
    let mut map = TileMap::new();
    for x in 0..4 {
        map.place_tile(c(x, 0), "heart");
    }
    map.undo();
    map.undo();
    assert!(map.can_redo());
    map.place_tile(c(9, 9), "spikes");
    assert!(!map.can_redo());
    assert_eq!(map.history_len(), map.history_index() + 1);
    assert_eq!(map.history_index(), 3);
}

#[test]
fn undo_then_redo_restores_exact_layers() {
    let mut map = TileMap::new();
    let mut states = vec![map.layers().clone()];
    for i in 0..5 {
        map.place_tile(c(i, i * 2), "coin_gold");
        states.push(map.layers().clone());
    }
    for depth in 1..=5 {
        for _ in 0..depth {
            assert!(map.undo());
        }
        assert_eq!(map.layers(), &states[5 - depth]);
        for _ in 0..depth {
            assert!(map.redo());
        }
        assert_eq!(map.layers(), &states[5]);
    }
    assert!(!map.redo());
}

#[test]
fn paint_then_erase_coin_gold() {
    let mut map = TileMap::new();
    let before = map.active_layer().unwrap().tiles.clone();
    assert!(map.place_tile(c(3, 7), "coin_gold"));
    assert_eq!(map.tile_at(c(3, 7)), Some("coin_gold"));
    assert!(map.erase_tile(c(3, 7)));
    let after = &map.active_layer().unwrap().tiles;
    assert!(after.get(c(3, 7)).is_none());
    assert_eq!(after, &before);
    assert_eq!(map.history_index(), 2);
}

#[test]
fn locked_layer_is_never_mutated() {
    let mut map = TileMap::new();
    map.place_tile(c(0, 0), "heart");
    map.toggle_layer_lock(&LayerId::from("2")).unwrap();
    let tiles = map.active_layer().unwrap().tiles.clone();
    let len = map.history_len();

    assert!(!map.place_tile(c(1, 1), "heart"));
    assert!(!map.erase_tile(c(0, 0)));
    assert_eq!(map.fill(c(0, 0), "spikes", 100), 0);
    assert_eq!(map.active_layer().unwrap().tiles, tiles);
    assert_eq!(map.history_len(), len);
}

#[test]
fn switching_layers_switches_tileset_and_cell_size() {
    let mut map = TileMap::new();
    let expected = [
        ("1", TilesetKind::Background, 256),
        ("2", TilesetKind::Foreground, 64),
        ("3", TilesetKind::Entities, 64),
    ];
    for (id, kind, size) in expected {
        map.set_active_layer(&LayerId::from(id)).unwrap();
        assert_eq!(map.current_tileset_kind(), kind);
        assert_eq!(map.active_cell_size(), size);
    }
}

#[test]
fn grid_is_unbounded_in_every_direction() {
    let mut map = TileMap::new();
    let far = [c(i32::MIN, 0), c(-1, -1), c(1_000_000, -1_000_000)];
    for cell in far {
        assert!(map.place_tile(cell, "heart"));
    }
    for cell in far {
        assert_eq!(map.tile_at(cell), Some("heart"));
    }
}
