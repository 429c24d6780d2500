pub mod diplomacy;
pub mod economy;
pub mod expansion;
pub mod formation;
pub mod logging;
pub mod navy;
pub mod secession;
pub mod turn;
pub mod warfare;

pub use diplomacy::*;
pub use economy::*;
pub use formation::*;
pub use logging::*;
pub use turn::*;
pub use warfare::*;
