//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 同步器行为性质 (对外 API)
//! - 随机输入性质测试
//! - 基于 tokio channel 的 e2e 测试
//! - 配置 -> 同步器 装配测试

#[cfg(test)]
mod contract_tests {
    use contracts::{BufferMode, SyncOptions};

    #[test]
    fn test_contracts_compile() {
        // 验证 contracts crate 可编译
        let _ = contracts::ConfigVersion::V1;
        assert_eq!(SyncOptions::default().mode(), BufferMode::UnboundedLatest);
    }
}

/// 公共辅助：`(label, value)` 输入
#[cfg(test)]
mod support {
    use std::collections::HashMap;

    use sync_engine::{LabelSet, SyncOptions, SyncedTuple, TupleSynchronizer};

    pub type Item = (char, u32);
    pub type Key = fn(&Item) -> char;
    pub type ItemSync = TupleSynchronizer<char, Item, Key>;

    pub fn key(item: &Item) -> char {
        item.0
    }

    pub fn labels(set: &str) -> LabelSet<char> {
        set.chars().collect()
    }

    pub fn synchronizer(set: &str, options: SyncOptions) -> ItemSync {
        TupleSynchronizer::new(labels(set), options, key as Key)
    }

    /// `"a1 a2 d b1"` -> `[('a',1), ('a',2), ('d',0), ('b',1)]`
    pub fn items(text: &str) -> Vec<Item> {
        text.split_whitespace()
            .map(|tok| {
                let mut chars = tok.chars();
                let label = chars.next().unwrap();
                let n = chars.as_str().parse().unwrap_or(0);
                (label, n)
            })
            .collect()
    }

    /// Tuple contents as `label -> sequence number`
    pub fn contents(tuple: &SyncedTuple<char, Item>) -> HashMap<char, u32> {
        tuple.values.iter().map(|(l, v)| (*l, v.1)).collect()
    }

    pub fn expect(pairs: &[(char, u32)]) -> HashMap<char, u32> {
        pairs.iter().copied().collect()
    }
}

#[cfg(test)]
mod behavior_tests {
    use contracts::EmitTrigger;
    use sync_engine::{reduce, sync_tuples, Collect, SyncOptions, Synchronize};

    use crate::support::*;

    #[test]
    fn test_default_options_emit_latest_values() {
        let out = sync_tuples(
            labels("ab"),
            SyncOptions::default(),
            key as Key,
            items("a1 a2 d b1 b2 c a3"),
        )
        .unwrap();

        let got: Vec<_> = out.iter().map(contents).collect();
        assert_eq!(
            got,
            vec![expect(&[('a', 2), ('b', 1)]), expect(&[('a', 3), ('b', 2)])]
        );
        assert!(out.iter().all(|t| t.meta.trigger == EmitTrigger::AllPresent));
        assert_eq!(out[0].tuple_id, 1);
        assert_eq!(out[1].tuple_id, 2);
    }

    #[test]
    fn test_carry_forward_without_reset() {
        let options = SyncOptions {
            reset: false,
            ..Default::default()
        };
        let out = sync_tuples(labels("ab"), options, key as Key, items("a1 a2 d b1 b2 c a3"))
            .unwrap();

        let got: Vec<_> = out.iter().map(contents).collect();
        assert_eq!(
            got,
            vec![
                expect(&[('a', 2), ('b', 1)]),
                expect(&[('a', 2), ('b', 2)]),
                expect(&[('a', 3), ('b', 2)]),
            ]
        );
    }

    #[test]
    fn test_merge_only_emits_on_every_value() {
        let options = SyncOptions {
            merge_only: true,
            reset: false,
            ..Default::default()
        };
        let out = sync_tuples(labels("ab"), options, key as Key, items("a1 b1 a2")).unwrap();

        let got: Vec<_> = out.iter().map(contents).collect();
        assert_eq!(
            got,
            vec![
                expect(&[('a', 1)]),
                expect(&[('a', 1), ('b', 1)]),
                expect(&[('a', 2), ('b', 1)]),
            ]
        );
        assert_eq!(out[0].meta.trigger, EmitTrigger::MergeOnly);
        assert_eq!(out[0].meta.missing_labels, vec!['b']);
        assert_eq!(out[1].meta.trigger, EmitTrigger::AllPresent);
    }

    #[test]
    fn test_fifo_limit_one_overflows_on_second_value() {
        let options = SyncOptions {
            back_pressure: 1,
            ..Default::default()
        };
        let mut sync = synchronizer("ab", options);

        assert!(sync.push(('a', 1)).unwrap().is_empty());
        let err = sync.push(('a', 2)).unwrap_err();
        assert!(err.is_overflow());
        assert_eq!(
            err.to_string(),
            "max back pressure (1) exceeded for label 'a'"
        );

        // the instance stays failed
        assert!(sync.push(('b', 1)).unwrap_err().is_overflow());
        assert!(sync.finish().unwrap_err().is_overflow());
    }

    #[test]
    fn test_fifo_pairs_in_arrival_order() {
        let options = SyncOptions {
            back_pressure: 2,
            ..Default::default()
        };
        let mut sync = synchronizer("ab", options);

        assert!(sync.push(('a', 1)).unwrap().is_empty());
        assert!(sync.push(('a', 2)).unwrap().is_empty());

        let first = sync.push(('b', 1)).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(contents(&first[0]), expect(&[('a', 1), ('b', 1)]));

        let second = sync.push(('b', 2)).unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(contents(&second[0]), expect(&[('a', 2), ('b', 2)]));

        assert_eq!(sync.buffered(), 0);
        assert!(sync.finish().unwrap().is_none());
    }

    #[test]
    fn test_no_flush_without_all() {
        for back_pressure in [0, 3] {
            let options = SyncOptions {
                all: false,
                back_pressure,
                ..Default::default()
            };
            let out = sync_tuples(labels("abc"), options, key as Key, items("a1 b1 a2")).unwrap();
            assert!(out.is_empty(), "back_pressure={back_pressure}");
        }
    }

    #[test]
    fn test_final_partial_tuple_on_completion() {
        let out = sync_tuples(
            labels("abc"),
            SyncOptions::default(),
            key as Key,
            items("a1 b1 a2"),
        )
        .unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(contents(&out[0]), expect(&[('a', 2), ('b', 1)]));
        assert_eq!(out[0].meta.trigger, EmitTrigger::Flush);
        assert_eq!(out[0].meta.missing_labels, vec!['c']);
    }

    #[test]
    fn test_second_completion_emits_nothing() {
        let mut sync = synchronizer("ab", SyncOptions::default());
        sync.push(('a', 1)).unwrap();

        assert!(sync.finish().unwrap().is_some());
        assert!(sync.finish().unwrap().is_none());
        assert!(sync.push(('b', 1)).unwrap().is_empty());
    }

    #[test]
    fn test_reduce_with_explicit_reducer() {
        let sync = synchronizer("ab", SyncOptions::default());
        let out = reduce(Synchronize::new(sync, Collect::new()), items("b1 a1 a2 b2")).unwrap();

        let got: Vec<_> = out.iter().map(contents).collect();
        assert_eq!(
            got,
            vec![expect(&[('a', 1), ('b', 1)]), expect(&[('a', 2), ('b', 2)])]
        );
    }

    #[test]
    fn test_label_set_changes_are_seen_live() {
        let mut sync = synchronizer("ab", SyncOptions::default());
        let shared = sync.labels().clone();

        sync.push(('a', 1)).unwrap();
        shared.add('c');
        assert!(sync.push(('b', 1)).unwrap().is_empty());

        let out = sync.push(('c', 1)).unwrap();
        assert_eq!(contents(&out[0]), expect(&[('a', 1), ('b', 1), ('c', 1)]));

        // dropping a label makes the rest sufficient
        shared.remove(&'c');
        sync.push(('a', 2)).unwrap();
        let out = sync.push(('b', 2)).unwrap();
        assert_eq!(contents(&out[0]), expect(&[('a', 2), ('b', 2)]));
    }
}

#[cfg(test)]
mod property_tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use sync_engine::SyncOptions;

    use crate::support::*;

    fn random_options(rng: &mut StdRng) -> SyncOptions {
        SyncOptions {
            merge_only: rng.random_bool(0.5),
            reset: rng.random_bool(0.5),
            all: rng.random_bool(0.5),
            back_pressure: if rng.random_bool(0.5) {
                0
            } else {
                rng.random_range(1..4)
            },
        }
    }

    /// Labels outside the set never produce output, in any mode
    #[test]
    fn test_out_of_set_values_never_emit() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let outsiders = ['x', 'y', 'z'];

        for _ in 0..200 {
            let options = random_options(&mut rng);
            let mut sync = synchronizer("ab", options);

            let len = rng.random_range(0..50);
            for n in 0..len {
                let label = outsiders[rng.random_range(0..outsiders.len())];
                let emitted = sync.push((label, n)).unwrap();
                assert!(emitted.is_empty(), "options={options:?}");
            }

            assert!(sync.finish().unwrap().is_none(), "options={options:?}");
            assert_eq!(sync.stats().ignored, len as u64);
            assert_eq!(sync.tuple_count(), 0);
        }
    }

    /// Every tuple holds only in-set labels, tuple ids count up from 1, and
    /// FIFO mode never buffers past its limit
    #[test]
    fn test_random_streams_respect_invariants() {
        let mut rng = StdRng::seed_from_u64(42);
        let alphabet = ['a', 'b', 'c', 'x'];

        for _ in 0..200 {
            let options = random_options(&mut rng);
            let mut sync = synchronizer("abc", options);
            let mut next_id = 1;

            for n in 0..rng.random_range(0..60) {
                let label = alphabet[rng.random_range(0..alphabet.len())];
                let tuples = match sync.push((label, n)) {
                    Ok(tuples) => tuples,
                    Err(err) => {
                        assert!(err.is_overflow());
                        assert!(options.back_pressure > 0);
                        break;
                    }
                };

                for tuple in tuples {
                    assert_eq!(tuple.tuple_id, next_id);
                    next_id += 1;
                    assert!(!tuple.is_empty());
                    assert!(tuple.values.keys().all(|l| "abc".contains(*l)));
                }
                if options.back_pressure > 0 {
                    assert!(sync.stats().max_queue_depth <= options.back_pressure);
                }
            }
        }
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;

    use observability::SyncMetricsAggregator;
    use sync_engine::{LabelSet, SyncOptions, TupleSynchronizer};
    use tokio::sync::mpsc;

    #[derive(Debug, Clone)]
    struct Sample {
        stream: &'static str,
        seq: u32,
    }

    /// Two producer tasks -> channel -> synchronizer task
    ///
    /// 验证 FIFO 模式下每个标签内的到达顺序被保留：
    /// 第 i 个 tuple 包含每个流的第 i 个值。
    #[tokio::test]
    async fn test_e2e_channel_pipeline() {
        const PER_STREAM: u32 = 20;

        let (tx, mut rx) = mpsc::channel::<Sample>(8);

        let producers: Vec<_> = ["left", "right"]
            .into_iter()
            .map(|stream| {
                let tx = tx.clone();
                tokio::spawn(async move {
                    for seq in 0..PER_STREAM {
                        if tx.send(Sample { stream, seq }).await.is_err() {
                            break;
                        }
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();
        drop(tx);

        let labels: LabelSet<&'static str> = ["left", "right"].into_iter().collect();
        let options = SyncOptions {
            back_pressure: PER_STREAM as usize,
            ..Default::default()
        };
        let key: fn(&Sample) -> &'static str = |s| s.stream;

        let consumer = tokio::spawn(async move {
            let mut sync = TupleSynchronizer::new(labels, options, key);
            let mut metrics = SyncMetricsAggregator::new();
            let mut tuples = Vec::new();

            while let Some(sample) = rx.recv().await {
                for tuple in sync.push(sample).expect("queue limit covers the stream") {
                    metrics.update(&tuple.meta, tuple.len());
                    tuples.push(tuple);
                }
            }
            if let Some(tuple) = sync.finish().expect("not failed") {
                metrics.update(&tuple.meta, tuple.len());
                tuples.push(tuple);
            }
            (tuples, metrics)
        });

        for producer in producers {
            producer.await.unwrap();
        }
        let (tuples, metrics) = consumer.await.unwrap();

        assert_eq!(tuples.len(), PER_STREAM as usize);
        for (i, tuple) in tuples.iter().enumerate() {
            let seqs: HashMap<_, _> = tuple.values.iter().map(|(l, s)| (*l, s.seq)).collect();
            assert_eq!(seqs.get("left"), Some(&(i as u32)));
            assert_eq!(seqs.get("right"), Some(&(i as u32)));
        }

        let summary = metrics.summary();
        assert_eq!(summary.total_tuples, PER_STREAM as u64);
        assert_eq!(summary.partial_tuples, 0);
        assert!((summary.tuple_width.mean - 2.0).abs() < 1e-10);
    }

    /// A label added by another task mid-stream is required from then on
    #[tokio::test]
    async fn test_label_set_shared_across_tasks() {
        let labels: LabelSet<char> = ['a', 'b'].into_iter().collect();
        let handle = labels.clone();
        let key: fn(&(char, u32)) -> char = |v| v.0;
        let mut sync = TupleSynchronizer::new(labels, SyncOptions::default(), key);

        assert_eq!(sync.push(('a', 1)).unwrap().len(), 0);
        assert_eq!(sync.push(('b', 1)).unwrap().len(), 1);

        tokio::spawn(async move {
            handle.add('c');
        })
        .await
        .unwrap();

        sync.push(('a', 2)).unwrap();
        assert!(sync.push(('b', 2)).unwrap().is_empty());
        assert_eq!(sync.push(('c', 2)).unwrap().len(), 1);
    }
}

#[cfg(test)]
mod config_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{LabelId, SyncedTuple};
    use serde_json::{json, Value};
    use sync_engine::{sync_tuples, BufferMode};

    const PIPELINE_TOML: &str = r#"
[input]
label_field = "stream"

[sync]
labels = ["camera", "lidar"]
back_pressure = 4
"#;

    /// 配置 -> 同步器 -> 输出 JSON
    #[test]
    fn test_blueprint_drives_synchronizer() {
        let blueprint = ConfigLoader::load_from_str(PIPELINE_TOML, ConfigFormat::Toml).unwrap();
        assert_eq!(
            blueprint.sync_options().mode(),
            BufferMode::BoundedFifo { limit: 4 }
        );

        let field = blueprint.input.label_field.clone();
        let key = move |record: &Value| {
            record[field.as_str()]
                .as_str()
                .map(LabelId::from)
                .unwrap_or_default()
        };
        let records = vec![
            json!({"stream": "camera", "frame": 1}),
            json!({"stream": "camera", "frame": 2}),
            json!({"stream": "radar", "frame": 1}),
            json!({"stream": "lidar", "frame": 1}),
            json!({"stream": "lidar", "frame": 2}),
        ];

        let out: Vec<SyncedTuple<LabelId, Value>> = sync_tuples(
            blueprint.label_set(),
            blueprint.sync_options(),
            key,
            records,
        )
        .unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].get("camera").unwrap()["frame"], 1);
        assert_eq!(out[0].get("lidar").unwrap()["frame"], 1);
        assert_eq!(out[1].get("camera").unwrap()["frame"], 2);

        let encoded = serde_json::to_value(&out[1]).unwrap();
        assert_eq!(encoded["tuple_id"], 2);
        assert_eq!(encoded["values"]["lidar"]["frame"], 2);
        assert_eq!(encoded["meta"]["trigger"], "drain");
    }

    #[test]
    fn test_invalid_blueprint_rejected() {
        let content = PIPELINE_TOML.replace(r#"["camera", "lidar"]"#, r#"["camera", "camera"]"#);
        let err = ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap_err();
        assert!(err.to_string().contains("duplicate label"));
    }
}
