use idlelock_core::policy;

pub fn run(secs: f64) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", policy::clamp_secs(secs).as_secs_f64());
    Ok(())
}
