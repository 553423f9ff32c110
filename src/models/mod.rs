pub mod resident;
pub mod letter;
pub mod template;
pub mod custom_field;
pub mod village;
pub mod settings;

pub use resident::*;
pub use letter::*;
pub use template::*;
pub use custom_field::*;
pub use village::*;
pub use settings::*;
