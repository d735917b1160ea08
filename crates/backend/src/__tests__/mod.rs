mod helpers;
mod reload;
