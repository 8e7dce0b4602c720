// Derived statistics: standings, league-wide accolades, playoff brackets, and
// the franchise table.

pub mod accolades;
pub mod bracket;
pub mod franchise;
pub mod standings;
