// Small demo of the library: one forward/backward pass of the KL-divergence
// loss over a random batch. An optional first argument names a JSON loss
// config (see `LossParameter::load_json`).
//   RUST_LOG=debug cargo run -- config.json
use ferrite_kld::{create_layer, Blob, LossParameter, PropagateDown};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> ferrite_kld::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let param = match std::env::args().nth(1) {
        Some(path) => LossParameter::load_json(&path)?,
        None => LossParameter::default(),
    };

    let (batch, classes) = (8, 10);
    let mut predictions = Blob::random_distribution(batch, classes, 3.0);
    let labels: Vec<usize> = (0..batch).map(|i| i % classes).collect();
    let targets = Blob::one_hot(&labels, classes);

    let mut layer = create_layer("KLDLoss", &param)?;
    layer.reshape(&predictions, &targets)?;
    let loss = layer.forward(&predictions, &targets)?;
    layer.backward(layer.loss_weight(), PropagateDown::PREDICTIONS, &mut predictions, &targets)?;

    let grad_norm = predictions.diff().iter().map(|g| g * g).sum::<f64>().sqrt();
    info!(batch, classes, "ran KLDLoss on a random batch");
    println!("loss          = {loss:.6}");
    println!("gradient norm = {grad_norm:.6}");
    Ok(())
}
