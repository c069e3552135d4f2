/// egui rendering. Panels read `AppState` and mutate it only through its
/// methods.
pub mod metrics;
pub mod panels;
pub mod plot;
