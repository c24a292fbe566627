mod derive;
mod mock;
mod resolve;
mod saved;
