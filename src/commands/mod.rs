pub mod avaliacao;
pub mod system;
