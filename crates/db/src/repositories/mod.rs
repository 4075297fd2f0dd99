pub mod lead;

pub use lead::SqlLeadRepository;
