pub(crate) mod helpers;
mod local_service;
