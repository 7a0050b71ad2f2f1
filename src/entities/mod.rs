pub mod buy_order;
pub mod expense;
pub mod product;
pub mod purchase;
pub mod purchase_line;
pub mod retaceo_header;
pub mod retaceo_line;
