pub mod ai_record;
pub mod calf_record;
pub mod cow;
pub mod feedlot;
pub mod history;
pub mod inseminator;
pub mod lookup;
pub mod pregnancy_diagnosis;
pub mod semen;
pub mod system_setting;
pub mod transponder;
