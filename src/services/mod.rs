// Engine components, leaf-first: expense aggregation feeds the proration
// calculator; allocations persist its output; approval commits it.
pub mod allocations;
pub mod approval;
pub mod expenses;
pub mod proration;
