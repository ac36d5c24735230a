pub mod legacy;
pub mod pickroute;
pub mod singlebatch;
pub mod utils;
