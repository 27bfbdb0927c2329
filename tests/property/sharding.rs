// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Shard Routing

use cim_resource_streams::streams::{
    base_stream_name, shard_index, shard_stream_name, StreamRouting,
};
use proptest::prelude::*;

proptest! {
    /// Property: shard indices are 1-based and within the shard count
    #[test]
    fn prop_shard_index_in_range(project in "[a-f0-9-]{0,64}", shards in 1u32..64) {
        let shard = shard_index(&project, shards);
        prop_assert!((1..=shards).contains(&shard));
    }

    /// Property: the same project always maps to the same shard
    #[test]
    fn prop_shard_index_is_stable(project in "\\PC{0,80}", shards in 1u32..64) {
        prop_assert_eq!(shard_index(&project, shards), shard_index(&project, shards));
    }

    /// Property: with sharding disabled every project uses its base stream
    #[test]
    fn prop_disabled_sharding_uses_base_stream(
        project in "[a-f0-9-]{1,36}",
        count in any::<i64>(),
    ) {
        let routing = StreamRouting::new(false, 4, 0);
        prop_assert_eq!(routing.stream_for(&project, count), base_stream_name(&project));
    }

    /// Property: above the threshold the project uses its hashed shard
    #[test]
    fn prop_high_traffic_uses_hashed_shard(
        project in "[a-f0-9-]{1,36}",
        threshold in 0i64..10_000,
        above in 1i64..10_000,
    ) {
        let routing = StreamRouting::new(true, 4, threshold);
        prop_assert_eq!(
            routing.stream_for(&project, threshold + above),
            shard_stream_name(&project, shard_index(&project, 4))
        );
        prop_assert_eq!(routing.stream_for(&project, threshold), base_stream_name(&project));
    }
}
