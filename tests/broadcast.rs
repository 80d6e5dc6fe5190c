use fanout_dsp::objects::{Fm, FmParams, Proxy, Sine, SineParams};
use fanout_dsp::{broadcast, Arg, EngineConfig, EngineContext, Error, Value};

fn floats(values: &[Value]) -> Vec<f64> {
    values.iter().map(|v| v.as_f64().unwrap()).collect()
}

#[test]
fn scalars_follow_the_longest_sequence() {
    let freq = Arg::from(vec![100.0, 200.0, 300.0]);
    let phase = Arg::from(0.0);
    let args = broadcast(&[("freq", &freq), ("phase", &phase)], None).unwrap();

    assert_eq!(args.len(), 3);
    assert_eq!(floats(args.get("freq").unwrap()), vec![100.0, 200.0, 300.0]);
    assert_eq!(floats(args.get("phase").unwrap()), vec![0.0, 0.0, 0.0]);
}

#[test]
fn two_carriers_share_one_ratio() {
    let carrier = Arg::from(vec![250.5, 250.0]);
    let ratio = Arg::from(0.2499);
    let args = broadcast(&[("carrier", &carrier), ("ratio", &ratio)], None).unwrap();

    assert_eq!(args.len(), 2);
    assert_eq!(floats(args.get("ratio").unwrap()), vec![0.2499, 0.2499]);
}

#[test]
fn shorter_sequence_wraps() {
    let a = Arg::from(vec![1, 2, 3]);
    let b = Arg::from(vec![10, 20]);
    let args = broadcast(&[("a", &a), ("b", &b)], None).unwrap();

    assert_eq!(args.len(), 3);
    assert_eq!(
        args.get("b").unwrap(),
        &[Value::Int(10), Value::Int(20), Value::Int(10)]
    );
}

#[test]
fn equal_lengths_are_unchanged() {
    let a = Arg::from(vec![1.0, 2.0]);
    let b = Arg::from(vec![3.0, 4.0]);
    let args = broadcast(&[("a", &a), ("b", &b)], None).unwrap();
    assert_eq!(floats(args.column(0)), vec![1.0, 2.0]);
    assert_eq!(floats(args.column(1)), vec![3.0, 4.0]);
}

#[test]
fn empty_sequence_is_rejected() {
    let empty = Arg::Seq(vec![]);
    let err = broadcast(&[("freq", &empty)], None).unwrap_err();
    assert!(matches!(err, Error::EmptyBroadcastInput { ref param } if param == "freq"));
}

#[test]
fn objects_expand_to_one_stream_per_channel() {
    let ctx = EngineContext::new(EngineConfig::default().sample_rate(1_000.0).block_size(10)).unwrap();

    let fm = Fm::new(&ctx, FmParams {
        carrier: vec![250.5, 250.0].into(),
        ratio: Arg::from(0.2499),
        ..Default::default()
    })
    .unwrap();
    assert_eq!(fm.core().channels(), 2);

    let sines = Sine::new(&ctx, SineParams {
        freq: vec![100.0, 200.0, 300.0].into(),
        ..Default::default()
    })
    .unwrap();
    assert_eq!(sines.core().channels(), 3);
    assert_eq!(ctx.unit_count(), 5);

    drop(fm);
    drop(sines);
    assert_eq!(ctx.unit_count(), 0);
}

#[test]
fn random_mixes_expand_to_the_longest_sequence() {
    let mut rng = fastrand::Rng::with_seed(0x5eed);
    for _ in 0..500 {
        let count = rng.usize(1..6);
        let args: Vec<Arg> = (0..count)
            .map(|_| {
                if rng.bool() {
                    Arg::from(rng.i64(-100..100))
                } else {
                    let len = rng.usize(1..9);
                    Arg::from((0..len).map(|_| rng.f64()).collect::<Vec<_>>())
                }
            })
            .collect();
        let names: Vec<String> = (0..count).map(|i| format!("p{i}")).collect();
        let params: Vec<(&str, &Arg)> = names.iter().map(String::as_str).zip(&args).collect();

        let expanded = broadcast(&params, None).unwrap();
        let longest = args.iter().filter_map(Arg::seq_len).max().unwrap_or(1);
        assert_eq!(expanded.len(), longest);

        for (k, arg) in args.iter().enumerate() {
            let column = expanded.column(k);
            assert_eq!(column.len(), longest);
            match arg {
                Arg::Scalar(v) => assert!(column.iter().all(|c| c == v)),
                Arg::Seq(seq) => {
                    for (i, c) in column.iter().enumerate() {
                        assert_eq!(c, &seq[i % seq.len()]);
                    }
                }
            }
        }
    }
}
