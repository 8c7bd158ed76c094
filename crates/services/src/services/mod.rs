pub mod ai_record;
pub mod feedlot;
pub mod pd_maturation;
pub mod pregnancy;
pub mod reconciliation;
pub mod selection;
pub mod transponder;
