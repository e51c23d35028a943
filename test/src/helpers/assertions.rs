/// Assert a client's replica shows a tile in the given state
#[macro_export]
macro_rules! assert_tile_state {
    ($client:expr, ($x:expr, $y:expr), $state:expr) => {
        assert_eq!(
            $client.tile_state($crate::coords($x, $y)),
            $state,
            "tile {}-{} is in the wrong state",
            $x,
            $y
        );
    };
}

/// Assert two clients' replicas agree on every revealed tile
#[macro_export]
macro_rules! assert_tiles_agree {
    ($left:expr, $right:expr) => {
        let left: (std::collections::BTreeSet<_>, std::collections::BTreeSet<_>) =
            $left.with_replica(|replica| {
                (
                    replica.revealed_tiles().copied().collect(),
                    replica.always_revealed_tiles().copied().collect(),
                )
            });
        let right: (std::collections::BTreeSet<_>, std::collections::BTreeSet<_>) =
            $right.with_replica(|replica| {
                (
                    replica.revealed_tiles().copied().collect(),
                    replica.always_revealed_tiles().copied().collect(),
                )
            });
        assert_eq!(left, right, "replicas disagree on revealed tiles");
    };
}

/// Assert no marker in a replica still carries a placeholder id
#[macro_export]
macro_rules! assert_no_placeholders {
    ($client:expr) => {
        let placeholders = $client.with_replica(|replica| {
            replica
                .markers()
                .filter(|marker| marker.id.is_placeholder())
                .count()
        });
        assert_eq!(placeholders, 0, "placeholder markers left in the replica");
    };
}
