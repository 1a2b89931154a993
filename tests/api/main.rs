mod health_check;
mod helpers;
mod import;
mod lists;
mod subscribers;
