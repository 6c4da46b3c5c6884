mod controller;
mod framenum;
mod media;
mod rational;
mod speed;

pub use controller::*;
pub use framenum::*;
pub use media::*;
pub use rational::*;
pub use speed::*;
