// End-to-end centroiding tests on synthetic guide frames.
//
// The scenarios use point-sampled Gaussian stars rendered into 16-bit
// frames. Noise, when present, comes from a seeded StdRng so every run
// sees the same frame.
