mod share_record;

pub use share_record::{LedgerStats, ShareRecord};
