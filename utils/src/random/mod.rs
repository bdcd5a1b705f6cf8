pub fn random_u32() -> u32 {
    rand::random::<u32>()
}

pub fn random_u16() -> u16 {
    rand::random::<u16>()
}
