mod analysis;
mod system;

pub use analysis::render_phase_diagram;
pub use system::WasmSystem;
