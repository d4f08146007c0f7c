/// Print a fresh key suitable for API_KEY.
pub fn run() {
    println!("sk-{}", uuid::Uuid::new_v4().simple());
}
