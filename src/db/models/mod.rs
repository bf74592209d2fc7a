pub mod medication;
pub mod medication_log;
pub mod user;

pub use medication::{Medication, MedicationDraft, MedicationInput};
pub use medication_log::{LogDoseInput, MedicationLog};
pub use user::{UserId, UserProfile, UserStats};
