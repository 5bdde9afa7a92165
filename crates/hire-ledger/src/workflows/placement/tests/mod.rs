mod common;
mod offers;
mod safety;
