pub mod controls;
pub mod flavor;
pub mod gui_interface;
