use std::sync::{Arc, Mutex};

use approx::assert_abs_diff_eq;
use fanout_dsp::command::{Message, Router};
use fanout_dsp::objects::{Proxy, ProxyExt, Sine, SineParams};
use fanout_dsp::{Arg, EngineConfig, EngineContext};

const BLOCK: usize = 10;

fn context() -> EngineContext {
    EngineContext::new(EngineConfig::default().sample_rate(1_000.0).block_size(BLOCK)).unwrap()
}

/// Constant signal: a sine frozen at its peak, scaled by `mul`.
fn dc(ctx: &EngineContext, levels: Vec<f64>) -> Sine {
    Sine::new(ctx, SineParams {
        freq: Arg::from(vec![0.0; levels.len()]),
        phase: Arg::from(0.25),
        mul: levels.into(),
        ..Default::default()
    })
    .unwrap()
}

fn render(ctx: &EngineContext, blocks: usize) -> Vec<f32> {
    let mut out = vec![0.0; BLOCK * ctx.config().nchnls * blocks];
    ctx.process_block(&mut out);
    out
}

#[test]
fn out_routes_streams_to_consecutive_channels() {
    let ctx = context();
    let mut src = dc(&ctx, vec![0.5, -0.25]);

    assert!(render(&ctx, 1).iter().all(|&s| s == 0.0));

    src.out().unwrap();
    let out = render(&ctx, 1);
    assert_abs_diff_eq!(out[0], 0.5, epsilon = 1e-6);
    assert_abs_diff_eq!(out[1], -0.25, epsilon = 1e-6);
}

#[test]
fn stop_silences_and_drop_releases() {
    let ctx = context();
    let mut src = dc(&ctx, vec![0.5]);
    src.out().unwrap();
    assert!(src.core().is_playing());

    src.stop().unwrap();
    assert!(!src.core().is_playing());
    assert!(render(&ctx, 2).iter().all(|&s| s == 0.0));

    drop(src);
    assert_eq!(ctx.unit_count(), 0);
}

#[test]
fn setter_updates_running_units() {
    let ctx = context();
    let mut src = dc(&ctx, vec![0.5, 0.5]);
    src.out().unwrap();
    render(&ctx, 1);

    src.set_mul(vec![0.1, 0.2]).unwrap();
    let out = render(&ctx, 1);
    assert_abs_diff_eq!(out[0], 0.1, epsilon = 1e-6);
    assert_abs_diff_eq!(out[1], 0.2, epsilon = 1e-6);
}

#[test]
fn router_drives_bound_attributes_over_the_bus() {
    let ctx = context();
    let src = Arc::new(Mutex::new(dc(&ctx, vec![0.5])));
    src.lock().unwrap().out().unwrap();

    let mut router = Router::new(9000);
    router.bind("dc", Arc::clone(&src));
    assert!(router.addresses().contains(&"/dc/mul".to_string()));
    router.listen(ctx.bus());

    ctx.bus().deliver(9000, &Message::float("/dc/mul", 0.75)).unwrap();
    let out = render(&ctx, 1);
    assert_abs_diff_eq!(out[0], 0.75, epsilon = 1e-6);
}

#[test]
fn process_splits_long_buffers_into_blocks() {
    let ctx = context();
    let mut src = dc(&ctx, vec![0.5]);
    src.out().unwrap();

    let out = render(&ctx, 5);
    assert_eq!(out.len(), 5 * BLOCK * 2);
    assert!(out.chunks(2).all(|frame| (frame[0] - 0.5).abs() < 1e-6));
    assert_abs_diff_eq!(ctx.elapsed(), 0.05, epsilon = 1e-9);
}
