pub mod applications;
pub mod hall;
pub mod notices;
pub mod seats;
